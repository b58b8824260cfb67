//! Query execution: `POST /v1/query`.

use std::collections::BTreeMap;

use piweb_query::{Frame, QueryError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST /v1/query`.
///
/// ```json
/// {
///   "queries": [{
///     "RefID": "A",
///     "MaxDataPoints": 500,
///     "Interval": 30000000000,
///     "TimeRange": { "From": "2024-01-01T00:00:00Z", "To": "2024-01-01T06:00:00Z" },
///     "JSON": { "target": "\\\\AF\\DB\\Pump;Pressure", "isPiPoint": false }
///   }]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryDataRequest {
    /// Raw host queries. Each one is decoded into a
    /// [`piweb_query::Query`] on its own, so a malformed entry fails only
    /// its own RefID.
    pub queries: Vec<Value>,

    /// Datasource instance UID used in channel addresses. Defaults to the
    /// service's configured UID when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource_uid: Option<String>,
}

/// Frames and errors for one RefID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DataResponse {
    /// One frame per target segment, in submission order.
    pub frames: Vec<Frame>,

    /// Every [`QueryError`] that affected this RefID.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<QueryError>,
}

/// Response body for `POST /v1/query`: every RefID of the request maps to
/// a [`DataResponse`], even when all of its segments failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct QueryDataResponse {
    pub responses: BTreeMap<String, DataResponse>,
}

impl QueryDataResponse {
    pub fn get(&self, ref_id: &str) -> Option<&DataResponse> {
        self.responses.get(ref_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uid_is_optional() {
        let json = r#"{"queries":[]}"#;
        let req: QueryDataRequest = serde_json::from_str(json).unwrap();
        assert!(req.datasource_uid.is_none());
        assert!(req.queries.is_empty());
    }

    #[test]
    fn malformed_query_does_not_fail_the_request() {
        let json = r#"{"queries":[
            {"RefID":"A","TimeRange":{"From":"2024-01-01T00:00:00Z","To":"2024-01-01T01:00:00Z"},"JSON":{"target":"Base;X"}},
            {"RefID":"B","JSON":{"target":"Base;Y","segments":7}}
        ]}"#;
        let req: QueryDataRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.queries.len(), 2);
        assert!(piweb_query::Query::from_value(&req.queries[0]).is_ok());
        assert!(piweb_query::Query::from_value(&req.queries[1]).is_err());
    }

    #[test]
    fn errors_are_omitted_when_empty() {
        let mut resp = QueryDataResponse::default();
        resp.responses.insert("A".into(), DataResponse::default());
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["responses"]["A"].get("errors").is_none());

        resp.responses
            .get_mut("A")
            .unwrap()
            .errors
            .push(QueryError::BatchTransport("connection refused".into()));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["responses"]["A"]["errors"][0]["kind"], "batch_transport");
        assert_eq!(
            json["responses"]["A"]["errors"][0]["message"],
            "connection refused"
        );
    }
}
