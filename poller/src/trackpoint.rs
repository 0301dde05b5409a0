use eyre::{
    Context as _,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::{
    Map,
    Value,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitnessPointData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_meters_per_sec: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One sample of the LiveTrack feed.
///
/// Fields the provider sends that are not modelled here survive in `extra`
/// so templates can still reach them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trackpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness_point_data: Option<FitnessPointData>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Trackpoint {
    /// Fill in the fields that go missing while the watch has no GPS fix.
    /// The fitness record itself is never made up.
    pub fn with_defaults(mut self) -> Self {
        self.speed = Some(self.speed.unwrap_or(0.0));
        if let Some(fitness) = self.fitness_point_data.as_mut() {
            fitness.speed_meters_per_sec = Some(fitness.speed_meters_per_sec.unwrap_or(0.0));
        }
        self
    }

    /// The JSON record templates are evaluated against.
    pub fn to_scope(&self) -> Result<Value> {
        serde_json::to_value(self).context("failed to convert trackpoint into a template scope")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackpointsResponse {
    #[serde(default)]
    track_points: Option<Vec<Value>>,
}

/// A trackpoints response after defaulting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// Last sample of the response, with defaults applied.
    pub latest: Option<Trackpoint>,
    /// Every sample as received, the latest included.
    pub track_points: Vec<Value>,
}

/// Extract the samples of a trackpoints response. The payload itself is not
/// modified so it can be written out as received.
///
/// Only the last sample is typed, earlier ones are kept as raw JSON.
pub fn normalize(payload: &Value) -> Result<Normalized> {
    let response = TrackpointsResponse::deserialize(payload).context("malformed trackpoints payload")?;
    let track_points = response.track_points.unwrap_or_default();
    let latest = track_points
        .last()
        .map(|sample| Trackpoint::deserialize(sample).context("malformed latest trackpoint"))
        .transpose()?
        .map(Trackpoint::with_defaults);

    Ok(Normalized { latest, track_points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn picks_the_last_sample() {
        let payload = json!({
            "trackPoints": [
                {"speed": 1.0, "altitude": 10},
                {"speed": 2.5, "altitude": 12, "heartRate": 140}
            ],
            "sessionId": "abc"
        });

        let normalized = normalize(&payload).unwrap();

        assert_eq!(normalized.track_points.len(), 2);
        let latest = normalized.latest.unwrap();
        assert_eq!(latest.speed, Some(2.5));
        assert_eq!(latest.altitude, Some(12.0));
        assert_eq!(latest.extra.get("heartRate"), Some(&json!(140)));
    }

    #[test]
    fn defaults_missing_speeds() {
        let payload = json!({
            "trackPoints": [{
                "position": {"lat": 1, "lon": 2},
                "fitnessPointData": {"distanceMeters": 5000}
            }]
        });

        let latest = normalize(&payload).unwrap().latest.unwrap();
        let scope = latest.to_scope().unwrap();

        assert_eq!(scope["speed"], json!(0.0));
        assert_eq!(scope["fitnessPointData"]["speedMetersPerSec"], json!(0.0));
        assert_eq!(scope["fitnessPointData"]["distanceMeters"], json!(5000.0));
        assert_eq!(scope.get("altitude"), None);
    }

    #[test]
    fn never_invents_the_fitness_record() {
        let payload = json!({"trackPoints": [{"speed": null}]});

        let latest = normalize(&payload).unwrap().latest.unwrap();

        assert_eq!(latest.speed, Some(0.0));
        assert_eq!(latest.fitness_point_data, None);
        assert_eq!(latest.to_scope().unwrap().get("fitnessPointData"), None);
    }

    #[test]
    fn leaves_earlier_samples_untouched() {
        let payload = json!({"trackPoints": [{"altitude": 1}, {"altitude": 2}]});

        let normalized = normalize(&payload).unwrap();

        assert_eq!(normalized.track_points[0], json!({"altitude": 1}));
        assert_eq!(normalized.track_points[1], json!({"altitude": 2}));
        assert_eq!(normalized.latest.unwrap().speed, Some(0.0));
    }

    #[test]
    fn odd_earlier_samples_are_tolerated() {
        let payload = json!({
            "trackPoints": [
                {"altitude": "n/a", "position": [0, 0]},
                {"altitude": 12, "speed": 3}
            ]
        });

        let normalized = normalize(&payload).unwrap();

        assert_eq!(normalized.track_points.len(), 2);
        assert_eq!(normalized.track_points[0]["altitude"], json!("n/a"));
        let latest = normalized.latest.unwrap();
        assert_eq!(latest.altitude, Some(12.0));
        assert_eq!(latest.speed, Some(3.0));
    }

    #[test]
    fn empty_or_missing_samples() {
        assert_eq!(normalize(&json!({"trackPoints": []})).unwrap(), Normalized::default());
        assert_eq!(normalize(&json!({})).unwrap(), Normalized::default());
        assert_eq!(normalize(&json!({"trackPoints": null})).unwrap(), Normalized::default());
    }

    #[test]
    fn malformed_payloads() {
        assert!(normalize(&json!({"trackPoints": "nope"})).is_err());
        assert!(normalize(&json!({"trackPoints": [42]})).is_err());
        assert!(normalize(&json!({"trackPoints": [{"altitude": 1}, {"altitude": "n/a"}]})).is_err());
        assert!(normalize(&json!([1, 2, 3])).is_err());
    }
}
