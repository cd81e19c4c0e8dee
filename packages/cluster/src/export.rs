//! `GeoJSON` rendering of clusters for map front-ends.

use cpa_map_violation_models::Located;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, feature::Id};

use crate::Cluster;

/// Renders clusters as a `FeatureCollection` of point features.
///
/// Each feature sits on the cluster centroid and carries `clusterId`,
/// `count`, `memberIds` and `singleton`, which is all a map layer needs to
/// choose between a typed pin and a count badge.
#[must_use]
pub fn clusters_to_geojson<T: Located>(clusters: &[Cluster<T>]) -> FeatureCollection {
    let features = clusters.iter().map(cluster_feature).collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn cluster_feature<T: Located>(cluster: &Cluster<T>) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("clusterId".to_string(), JsonValue::from(cluster.id.clone()));
    properties.insert("count".to_string(), JsonValue::from(cluster.count));
    properties.insert("memberIds".to_string(), JsonValue::from(cluster.member_ids()));
    properties.insert("singleton".to_string(), JsonValue::from(cluster.is_singleton()));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&cluster.centroid()))),
        id: Some(Id::String(cluster.id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use cpa_map_violation_models::{
        LocalizedText, ViolationRecord, ViolationStatus, ViolationType,
    };

    use super::*;
    use crate::{ClusterThreshold, cluster_records};

    fn record(id: i64, lat: f64, lng: f64) -> ViolationRecord {
        ViolationRecord {
            id,
            lat,
            lng,
            violation_type: ViolationType::CommercialFraud,
            report_date: NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(),
            description: LocalizedText::default(),
            status: ViolationStatus::Verified,
        }
    }

    #[test]
    fn one_feature_per_cluster() {
        let records = vec![
            record(1, 13.5783, 44.0135),
            record(2, 13.5790, 44.0140),
            record(3, 13.5650, 44.0000),
        ];
        let clusters = cluster_records(&records, ClusterThreshold::default());
        let collection = clusters_to_geojson(&clusters);

        assert_eq!(collection.features.len(), 2);

        let first = &collection.features[0];
        let props = first.properties.as_ref().unwrap();
        assert_eq!(props["count"], 2);
        assert_eq!(props["singleton"], false);
        assert_eq!(props["memberIds"], JsonValue::from(vec![1, 2]));

        let Some(geojson::Value::Point(coords)) = first.geometry.as_ref().map(|g| &g.value) else {
            panic!("expected a point geometry");
        };
        assert!((coords[0] - 44.013_75).abs() < 1e-9);
        assert!((coords[1] - 13.578_65).abs() < 1e-9);

        let second = collection.features[1].properties.as_ref().unwrap();
        assert_eq!(second["singleton"], true);
    }
}
