//! Endpoint paths, request bodies and response decoding for the service.

use serde::{Deserialize, Serialize};

use super::SyncError;
use crate::model::{Annotation, Image, ImageId, Project, ProjectId};

/// HTTP method of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// The service operations the client uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `GET /projects`
    ListProjects,
    /// `GET /projects/{id}/images`
    ListImages(ProjectId),
    /// `POST /annotations`
    SaveAnnotations,
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::ListProjects | Endpoint::ListImages(_) => Method::Get,
            Endpoint::SaveAnnotations => Method::Post,
        }
    }

    /// Path relative to the service base URL.
    pub fn path(&self) -> String {
        match self {
            Endpoint::ListProjects => "/projects".to_string(),
            Endpoint::ListImages(project_id) => format!("/projects/{}/images", project_id),
            Endpoint::SaveAnnotations => "/annotations".to_string(),
        }
    }

    /// Absolute URL for this endpoint under `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path())
    }
}

/// Body of `POST /annotations`.
#[derive(Debug, Clone, Serialize)]
pub struct SaveRequest<'a> {
    pub image_id: ImageId,
    pub annotations: &'a [Annotation],
}

/// Serialize the save request body.
pub fn encode_save(image_id: ImageId, annotations: &[Annotation]) -> Result<String, SyncError> {
    serde_json::to_string(&SaveRequest {
        image_id,
        annotations,
    })
    .map_err(|e| SyncError::Decode(e.to_string()))
}

/// Map a non-success status to [`SyncError::Remote`].
///
/// The service reports failures as `{"error": ...}` or `{"message": ...}`;
/// anything else is returned verbatim.
pub fn check_status(status: u16, body: &str) -> Result<(), SyncError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
        message: Option<String>,
    }
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .unwrap_or_else(|| body.trim().to_string());
    Err(SyncError::remote(status, message))
}

/// Decode the response to `GET /projects`.
pub fn decode_projects(status: u16, body: &str) -> Result<Vec<Project>, SyncError> {
    check_status(status, body)?;
    serde_json::from_str(body).map_err(|e| SyncError::Decode(format!("project list: {}", e)))
}

/// Decode the response to `GET /projects/{id}/images`.
pub fn decode_images(status: u16, body: &str) -> Result<Vec<Image>, SyncError> {
    check_status(status, body)?;
    serde_json::from_str(body).map_err(|e| SyncError::Decode(format!("image list: {}", e)))
}

/// Decode the response to `POST /annotations`. Only the status matters.
pub fn decode_save(status: u16, body: &str) -> Result<(), SyncError> {
    check_status(status, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_urls() {
        let base = "http://127.0.0.1:5000/";
        assert_eq!(
            Endpoint::ListProjects.url(base),
            "http://127.0.0.1:5000/projects"
        );
        assert_eq!(
            Endpoint::ListImages(7).url(base),
            "http://127.0.0.1:5000/projects/7/images"
        );
        assert_eq!(
            Endpoint::SaveAnnotations.url("http://svc"),
            "http://svc/annotations"
        );
        assert_eq!(Endpoint::SaveAnnotations.method(), Method::Post);
        assert_eq!(Endpoint::ListImages(1).method().as_str(), "GET");
    }

    #[test]
    fn test_decode_projects_with_optional_description() {
        let body = r#"[{"id":1,"name":"P1","description":null},{"id":2,"name":"P2","description":"two"}]"#;
        let projects = decode_projects(200, body).unwrap();
        assert_eq!(projects[0], Project::new(1, "P1"));
        assert_eq!(projects[1].description.as_deref(), Some("two"));
    }

    #[test]
    fn test_decode_images() {
        let body = r#"[{"id":10,"name":"img","url":"u"}]"#;
        assert_eq!(
            decode_images(200, body).unwrap(),
            vec![Image::new(10, "img", "u")]
        );
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        assert!(matches!(
            decode_images(200, "<html>"),
            Err(SyncError::Decode(_))
        ));
    }

    #[test]
    fn test_error_status_extracts_message() {
        let err = decode_projects(500, r#"{"error":"database locked"}"#).unwrap_err();
        assert_eq!(err, SyncError::remote(500, "database locked"));

        let err = decode_save(404, "Not Found\n").unwrap_err();
        assert_eq!(err, SyncError::remote(404, "Not Found"));
    }

    #[test]
    fn test_created_is_success() {
        assert!(decode_save(201, r#"{"message":"Annotation saved"}"#).is_ok());
    }

    #[test]
    fn test_encode_save_body() {
        let annotations = vec![Annotation::new("a1").with_field("type", json!("Annotation"))];
        let body = encode_save(10, &annotations).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            value,
            json!({ "image_id": 10, "annotations": [{ "id": "a1", "type": "Annotation" }] })
        );
    }
}
