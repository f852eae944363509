//! The backend endpoints consumed by the client core.

use crate::{Endpoint, Method};
use agora_config_and_utils::models::{DebateId, PointId, Progress};
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::json;

// ==========================================
// Authentication
// ==========================================

/// `POST auth/token/`: exchange credentials for a token pair.
pub struct ObtainTokenPair {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for ObtainTokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObtainTokenPair")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

impl Endpoint for ObtainTokenPair {
    type Response = TokenPairResponse;

    fn path(&self) -> String {
        "auth/token/".to_string()
    }

    fn method(&self) -> Method {
        Method::Post
    }

    fn requires_auth(&self) -> bool {
        false
    }

    fn body(&self) -> Option<serde_json::Value> {
        Some(json!({ "email": self.email, "password": self.password }))
    }

    fn success_codes(&self) -> &'static [u16] {
        &[200]
    }
}

/// `POST auth/token/refresh/`: mint a new access token.
pub struct RefreshAccessToken {
    pub refresh: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

impl Endpoint for RefreshAccessToken {
    type Response = AccessTokenResponse;

    fn path(&self) -> String {
        "auth/token/refresh/".to_string()
    }

    fn method(&self) -> Method {
        Method::Post
    }

    fn requires_auth(&self) -> bool {
        false
    }

    fn body(&self) -> Option<serde_json::Value> {
        Some(json!({ "refresh": self.refresh }))
    }

    fn success_codes(&self) -> &'static [u16] {
        &[200]
    }
}

// ==========================================
// Starred
// ==========================================

/// `POST starred/`: star and unstar debates in one call.
#[derive(Debug, Clone, Default)]
pub struct PostStarred {
    pub starred: Vec<DebateId>,
    pub unstarred: Vec<DebateId>,
}

impl PostStarred {
    pub fn star(debate_id: DebateId) -> Self {
        Self {
            starred: vec![debate_id],
            unstarred: Vec::new(),
        }
    }

    pub fn unstar(debate_id: DebateId) -> Self {
        Self {
            starred: Vec::new(),
            unstarred: vec![debate_id],
        }
    }
}

impl Endpoint for PostStarred {
    type Response = IgnoredAny;

    fn path(&self) -> String {
        "starred/".to_string()
    }

    fn method(&self) -> Method {
        Method::Post
    }

    fn body(&self) -> Option<serde_json::Value> {
        Some(json!({ "starred_list": self.starred, "unstarred_list": self.unstarred }))
    }

    fn success_codes(&self) -> &'static [u16] {
        &[200, 201]
    }
}

/// `GET starred/`
#[derive(Debug, Clone, Copy, Default)]
pub struct GetStarred;

#[derive(Debug, Clone, Deserialize)]
pub struct StarredList {
    pub starred_list: Vec<DebateId>,
}

impl Endpoint for GetStarred {
    type Response = StarredList;

    fn path(&self) -> String {
        "starred/".to_string()
    }

    fn method(&self) -> Method {
        Method::Get
    }

    fn success_codes(&self) -> &'static [u16] {
        &[200]
    }
}

// ==========================================
// Progress
// ==========================================

/// `POST progress/`: mark one point seen.
#[derive(Debug, Clone, Copy)]
pub struct PostProgress {
    pub debate_id: DebateId,
    pub point_id: PointId,
}

impl Endpoint for PostProgress {
    type Response = IgnoredAny;

    fn path(&self) -> String {
        "progress/".to_string()
    }

    fn method(&self) -> Method {
        Method::Post
    }

    fn body(&self) -> Option<serde_json::Value> {
        Some(json!({ "debate_pk": self.debate_id, "point_pk": self.point_id }))
    }

    fn success_codes(&self) -> &'static [u16] {
        &[201]
    }
}

/// `POST progress/batch/`: mark many points seen across debates.
#[derive(Debug, Clone, Default)]
pub struct PostBatchProgress {
    pub entries: Vec<(DebateId, Vec<PointId>)>,
}

impl PostBatchProgress {
    pub fn single(debate_id: DebateId, points: Vec<PointId>) -> Self {
        Self {
            entries: vec![(debate_id, points)],
        }
    }
}

impl Endpoint for PostBatchProgress {
    type Response = IgnoredAny;

    fn path(&self) -> String {
        "progress/batch/".to_string()
    }

    fn method(&self) -> Method {
        Method::Post
    }

    fn body(&self) -> Option<serde_json::Value> {
        let progress: Vec<serde_json::Value> = self
            .entries
            .iter()
            .map(|(debate_id, points)| json!({ "debate_pk": debate_id, "seen_points": points }))
            .collect();
        Some(json!({ "progress": progress }))
    }

    fn success_codes(&self) -> &'static [u16] {
        &[201]
    }
}

/// `GET progress/`
#[derive(Debug, Clone, Copy, Default)]
pub struct GetProgress;

/// Server view of one debate's progress.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProgress {
    pub debate_pk: DebateId,
    #[serde(default)]
    pub completed_percentage: f64,
    #[serde(default)]
    pub seen_points: Vec<PointId>,
}

impl From<RemoteProgress> for Progress {
    fn from(remote: RemoteProgress) -> Self {
        let mut seen_points: Vec<PointId> = Vec::with_capacity(remote.seen_points.len());
        for point in remote.seen_points {
            if !seen_points.contains(&point) {
                seen_points.push(point);
            }
        }
        Progress {
            debate_id: remote.debate_pk,
            completed_percentage: remote.completed_percentage.round().clamp(0.0, 100.0) as u8,
            seen_points,
        }
    }
}

impl Endpoint for GetProgress {
    type Response = Vec<RemoteProgress>;

    fn path(&self) -> String {
        "progress/".to_string()
    }

    fn method(&self) -> Method {
        Method::Get
    }

    fn success_codes(&self) -> &'static [u16] {
        &[200]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode_body;

    #[test]
    fn auth_endpoints_skip_bearer() {
        let login = ObtainTokenPair {
            email: "a@b.c".into(),
            password: "hunter2".into(),
        };
        assert!(!login.requires_auth());
        assert!(!RefreshAccessToken { refresh: "r".into() }.requires_auth());
        assert!(!format!("{:?}", login).contains("hunter2"));
        assert_eq!(login.body().unwrap()["email"], "a@b.c");
    }

    #[test]
    fn starred_body_and_codes() {
        let endpoint = PostStarred::unstar(9);
        let body = endpoint.body().unwrap();
        assert_eq!(body["starred_list"], json!([]));
        assert_eq!(body["unstarred_list"], json!([9]));
        assert_eq!(endpoint.success_codes(), &[200, 201]);
        assert!(endpoint.requires_auth());
    }

    #[test]
    fn batch_progress_body() {
        let endpoint = PostBatchProgress {
            entries: vec![(1, vec![10, 11]), (2, vec![20])],
        };
        assert_eq!(
            endpoint.body().unwrap(),
            json!({ "progress": [
                { "debate_pk": 1, "seen_points": [10, 11] },
                { "debate_pk": 2, "seen_points": [20] },
            ]})
        );
        assert_eq!(endpoint.path(), "progress/batch/");
    }

    #[test]
    fn remote_progress_converts() {
        let decoded: Vec<RemoteProgress> = decode_body(
            r#"[{"debate_pk": 3, "completed_percentage": 66.6, "seen_points": [1, 2, 2]}]"#,
        )
        .unwrap();
        let progress: Progress = decoded.into_iter().next().unwrap().into();
        assert_eq!(progress.debate_id, 3);
        assert_eq!(progress.completed_percentage, 67);
        assert_eq!(progress.seen_points, vec![1, 2]);
    }

    #[test]
    fn starred_list_decodes() {
        let list: StarredList = decode_body(r#"{"starred_list": [4, 7]}"#).unwrap();
        assert_eq!(list.starred_list, vec![4, 7]);
    }
}
