//! Service façade: tier lookup, identify, compile, render.
//!
//! ```text
//! identifier + tier name + request path
//!     │ tier()      name → TierCap (config)
//!     │ identify()  backend → source Size
//!     │ compile()   five segments → CompiledRequest
//!     ▼ render()    backend → Rendered
//! ```
//!
//! The backend is chosen once from config; everything after that is the same
//! for local and remote engines.

use crate::config::{EngineKind, IiifConfig};
use crate::geometry::TierCap;
use crate::imaging::{BackendError, ImageBackend, RemoteBackend, RustBackend};
use crate::info::{InfoDocument, info_document};
use crate::pipeline::{CompiledRequest, Rendered, compile};
use crate::request::{RequestError, RequestSegments};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Unknown tier: {0}")]
    UnknownTier(String),
}

impl ServiceError {
    /// Whether the caller sent something unusable (bad request or tier name).
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Request(err) => err.is_client_error(),
            Self::UnknownTier(_) => true,
            Self::Backend(BackendError::NotFound(_)) => true,
            Self::Backend(_) => false,
        }
    }
}

pub struct IiifService {
    backend: Box<dyn ImageBackend>,
    tiers: BTreeMap<String, u32>,
}

impl IiifService {
    pub fn new(backend: Box<dyn ImageBackend>, tiers: BTreeMap<String, u32>) -> Self {
        Self { backend, tiers }
    }

    /// Build the service with the backend `config.engine` selects.
    pub fn from_config(config: &IiifConfig) -> Result<Self, ServiceError> {
        let backend: Box<dyn ImageBackend> = match config.engine.kind {
            EngineKind::Local => {
                log::debug!("local engine, masters in {}", config.source.root.display());
                Box::new(RustBackend::new(&config.source.root))
            }
            EngineKind::Remote => {
                let url = config.engine.remote_url.as_deref().ok_or_else(|| {
                    BackendError::Http("engine.remote_url is not configured".into())
                })?;
                log::debug!("remote engine at {url}");
                Box::new(RemoteBackend::new(
                    url,
                    Duration::from_secs(config.engine.timeout_secs),
                )?)
            }
        };
        Ok(Self::new(backend, config.tiers.clone()))
    }

    pub fn backend(&self) -> &dyn ImageBackend {
        self.backend.as_ref()
    }

    /// Cap for an optional tier name. No name means uncapped.
    pub fn tier(&self, name: Option<&str>) -> Result<Option<TierCap>, ServiceError> {
        match name {
            None => Ok(None),
            Some(name) => self
                .tiers
                .get(name)
                .map(|edge| Some(TierCap::new(*edge)))
                .ok_or_else(|| ServiceError::UnknownTier(name.to_string())),
        }
    }

    /// Identify the source and compile the request without rendering it.
    pub fn plan(
        &self,
        identifier: &str,
        tier: Option<&str>,
        segments: &RequestSegments,
    ) -> Result<CompiledRequest, ServiceError> {
        let cap = self.tier(tier)?;
        let source = self.backend.identify(identifier)?;
        Ok(compile(source, cap, segments)?)
    }

    /// Compile and render one derivative.
    pub fn derive(
        &self,
        identifier: &str,
        tier: Option<&str>,
        segments: &RequestSegments,
    ) -> Result<(CompiledRequest, Rendered), ServiceError> {
        let compiled = self.plan(identifier, tier, segments)?;
        let rendered = self.backend.render(identifier, &compiled)?;
        log::info!(
            "{identifier}/{} → {} ({} bytes, {})",
            segments.to_path(),
            compiled.size,
            rendered.len(),
            rendered.content_type
        );
        Ok((compiled, rendered))
    }

    pub fn info(
        &self,
        base_uri: &str,
        identifier: &str,
        tier: Option<&str>,
    ) -> Result<InfoDocument, ServiceError> {
        let cap = self.tier(tier)?;
        let source = self.backend.identify(identifier)?;
        Ok(info_document(base_uri, identifier, source, cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{PixelBox, Size};
    use crate::imaging::Operation;
    use crate::imaging::backend::tests::MockBackend;
    use std::sync::Arc;

    /// Forwards to a shared mock so tests can inspect what was rendered.
    struct Shared(Arc<MockBackend>);

    impl ImageBackend for Shared {
        fn identify(&self, identifier: &str) -> Result<Size, BackendError> {
            self.0.identify(identifier)
        }

        fn render(
            &self,
            identifier: &str,
            request: &CompiledRequest,
        ) -> Result<Rendered, BackendError> {
            self.0.render(identifier, request)
        }
    }

    fn service() -> (IiifService, Arc<MockBackend>) {
        let mock = Arc::new(MockBackend::with_source("page1", Size::new(4000, 3000)));
        let tiers = BTreeMap::from([("public".to_string(), 1000)]);
        (IiifService::new(Box::new(Shared(Arc::clone(&mock))), tiers), mock)
    }

    fn segments(path: &str) -> RequestSegments {
        RequestSegments::from_path(path).unwrap()
    }

    #[test]
    fn derive_renders_through_backend() {
        let (service, mock) = service();
        let (compiled, rendered) = service
            .derive("page1", None, &segments("0,0,100,100/max/0/default.png"))
            .unwrap();
        assert_eq!(compiled.size, Size::new(100, 100));
        assert_eq!(rendered.content_type, "image/png");
        assert_eq!(rendered.bytes, b"encoded");

        let calls = mock.rendered();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "page1");
        assert_eq!(calls[0].1[0], Operation::Crop(PixelBox::new(0, 0, 100, 100)));
    }

    #[test]
    fn tier_caps_max_requests() {
        let (service, _) = service();
        let compiled = service
            .plan("page1", Some("public"), &segments("full/max/0/default.jpg"))
            .unwrap();
        assert_eq!(compiled.size, Size::new(1000, 750));
    }

    #[test]
    fn no_tier_means_uncapped() {
        let (service, _) = service();
        let compiled = service
            .plan("page1", None, &segments("full/max/0/default.jpg"))
            .unwrap();
        assert_eq!(compiled.size, Size::new(4000, 3000));
        assert_eq!(compiled.operations().len(), 1);
    }

    #[test]
    fn unknown_tier_is_client_error() {
        let (service, mock) = service();
        let err = service
            .derive("page1", Some("staff"), &segments("full/max/0/default.jpg"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnknownTier(ref name) if name == "staff"));
        assert!(err.is_client_error());
        assert!(mock.rendered().is_empty());
    }

    #[test]
    fn request_errors_stop_before_render() {
        let (service, mock) = service();
        let err = service
            .derive("page1", None, &segments("full/max/0/default.pdf"))
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Request(RequestError::NotImplemented(_))
        ));
        assert!(!err.is_client_error());
        assert!(mock.rendered().is_empty());
    }

    #[test]
    fn missing_source_is_backend_not_found() {
        let (service, _) = service();
        let err = service
            .derive("nope", None, &segments("full/max/0/default.jpg"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Backend(BackendError::NotFound(_))));
        assert!(err.is_client_error());
    }

    #[test]
    fn info_advertises_tier() {
        let (service, _) = service();
        let doc = service.info("https://x/iiif", "page1", Some("public")).unwrap();
        assert_eq!(doc.width, 4000);
        assert_eq!(doc.profile.1.max_width, Some(1000));
        assert_eq!(doc.id, "https://x/iiif/page1");
    }

    #[test]
    fn from_config_selects_engine() {
        let mut config = IiifConfig::default();
        assert!(IiifService::from_config(&config).is_ok());

        config.engine.kind = EngineKind::Remote;
        assert!(IiifService::from_config(&config).is_err());

        config.engine.remote_url = Some("https://iiif.example.org/iiif/2".into());
        let service = IiifService::from_config(&config).unwrap();
        assert!(service.tier(None).unwrap().is_none());
    }

    #[test]
    fn config_tiers_resolve_through_service() {
        let mut config = IiifConfig::default();
        config.tiers.insert("thumbnail".into(), 200);
        let service = IiifService::from_config(&config).unwrap();
        assert_eq!(
            service.tier(Some("thumbnail")).unwrap(),
            Some(TierCap::new(200))
        );
        assert!(matches!(
            service.tier(Some("public")),
            Err(ServiceError::UnknownTier(_))
        ));
    }
}
