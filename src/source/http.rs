//! HTTP client for the recognition service's face endpoints.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use super::{FaceSource, SourceError};
use crate::model::{FaceId, Label, LabelId, Page};
use crate::pagination::PageQuery;

/// `GET facelabels` answers either with an object keyed by label or with a plain list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LabelListing {
    Keyed(BTreeMap<String, Label>),
    List(Vec<Label>),
}

impl LabelListing {
    fn into_labels(self) -> Vec<Label> {
        match self {
            Self::Keyed(map) => {
                let mut labels: Vec<Label> = map.into_values().collect();
                labels.sort_by_key(|l| l.id);
                labels
            }
            Self::List(list) => list,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpFaceSource {
    client: Client,
    base: Url,
}

impl HttpFaceSource {
    /// `api_url` is the API root, e.g. `http://frigate.local:5000/api/`.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let mut base = Url::parse(api_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("facectl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, SourceError> {
        Ok(self.base.join(path)?)
    }

    fn send(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Response, SourceError> {
        debug!(method, path, "sending request");
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                method,
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    fn post(&self, path: &str) -> Result<(), SourceError> {
        let request = self.client.post(self.url(path)?);
        self.send("POST", path, request)?;
        Ok(())
    }
}

impl FaceSource for HttpFaceSource {
    fn fetch_page(&self, query: &PageQuery) -> Result<Page, SourceError> {
        let request = self.client.get(self.url("faces")?).query(&query.params());
        let body = self.send("GET", "faces", request)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn fetch_labels(&self) -> Result<Vec<Label>, SourceError> {
        let request = self.client.get(self.url("facelabels")?);
        let body = self.send("GET", "facelabels", request)?.text()?;
        let listing: LabelListing = serde_json::from_str(&body)?;
        Ok(listing.into_labels())
    }

    fn update_face_label(&self, face: &FaceId, label: LabelId) -> Result<(), SourceError> {
        let path = format!("faces/{}/label", urlencoding::encode(face.as_str()));
        let request = self
            .client
            .put(self.url(&path)?)
            .json(&json!({ "labelid": label.0 }));
        self.send("PUT", &path, request)?;
        info!(%face, %label, "face relabelled");
        Ok(())
    }

    fn create_label(&self, text: &str) -> Result<(), SourceError> {
        let request = self
            .client
            .post(self.url("facelabels/add")?)
            .json(&json!({ "label": text }));
        self.send("POST", "facelabels/add", request)?;
        Ok(())
    }

    fn rename_label(&self, id: LabelId, text: &str) -> Result<(), SourceError> {
        let path = format!("facelabels/{id}/change");
        let request = self
            .client
            .put(self.url(&path)?)
            .json(&json!({ "label": text }));
        self.send("PUT", &path, request)?;
        Ok(())
    }

    fn delete_label(&self, id: LabelId) -> Result<(), SourceError> {
        let path = format!("facelabels/{id}/delete");
        let request = self.client.delete(self.url(&path)?);
        self.send("DELETE", &path, request)?;
        Ok(())
    }

    fn delete_face(&self, face: &FaceId) -> Result<(), SourceError> {
        let path = format!("faces/{}", urlencoding::encode(face.as_str()));
        let request = self.client.delete(self.url(&path)?);
        self.send("DELETE", &path, request)?;
        Ok(())
    }

    fn start_capture(&self) -> Result<(), SourceError> {
        self.post("faces/startcapture")
    }

    fn stop_capture(&self) -> Result<(), SourceError> {
        self.post("faces/stopcapture")
    }

    fn force_retrain(&self) -> Result<(), SourceError> {
        self.post("faces/forceretrain")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_gets_trailing_slash() {
        let source = HttpFaceSource::new("http://localhost:5000/api", Duration::from_secs(1))
            .expect("client");
        assert_eq!(source.base().as_str(), "http://localhost:5000/api/");
        assert_eq!(
            source.url("facelabels/3/change").unwrap().as_str(),
            "http://localhost:5000/api/facelabels/3/change"
        );
    }

    #[test]
    fn rejects_unparsable_url() {
        let err = HttpFaceSource::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, SourceError::Url(_)));
    }

    #[test]
    fn label_listing_accepts_both_shapes() {
        let keyed: LabelListing =
            serde_json::from_str(r#"{"a": {"id": 1, "label": "alice"}}"#).unwrap();
        assert_eq!(keyed.into_labels(), vec![Label::new(1, "alice")]);

        let list: LabelListing =
            serde_json::from_str(r#"[{"id": 2, "label": "bob"}]"#).unwrap();
        assert_eq!(list.into_labels(), vec![Label::new(2, "bob")]);
    }
}
