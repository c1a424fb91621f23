//! Vendor-specific DataTransfer routing.
//!
//! DataTransfer is OCPP's escape hatch: payloads are opaque and scoped by
//! a vendor id. Vendors register a [`VendorExtension`]; anything without a
//! registered handler falls through to a generic extension that accepts
//! and ignores the message.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

/// Status of a vendor-handled DataTransfer, per OCPP 1.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorReplyStatus {
    Accepted,
    Rejected,
    UnknownMessageId,
    UnknownVendorId,
}

#[derive(Debug, Clone)]
pub struct VendorReply {
    pub status: VendorReplyStatus,
    pub data: Option<String>,
}

impl VendorReply {
    pub fn accepted() -> Self {
        Self {
            status: VendorReplyStatus::Accepted,
            data: None,
        }
    }

    pub fn with_data(status: VendorReplyStatus, data: impl Into<String>) -> Self {
        Self {
            status,
            data: Some(data.into()),
        }
    }
}

/// A vendor-specific DataTransfer handler.
#[async_trait]
pub trait VendorExtension: Send + Sync {
    fn vendor_id(&self) -> &str;

    async fn handle(
        &self,
        charge_point_id: &str,
        message_id: Option<&str>,
        data: Option<&str>,
    ) -> VendorReply;
}

/// Fallback for unrecognized vendor ids: accept and ignore.
pub struct GenericVendorExtension;

#[async_trait]
impl VendorExtension for GenericVendorExtension {
    fn vendor_id(&self) -> &str {
        "*"
    }

    async fn handle(
        &self,
        charge_point_id: &str,
        message_id: Option<&str>,
        _data: Option<&str>,
    ) -> VendorReply {
        info!(charge_point_id, ?message_id, "DataTransfer handled generically");
        VendorReply::accepted()
    }
}

/// Routes DataTransfer by vendor id.
pub struct VendorRegistry {
    extensions: HashMap<String, Arc<dyn VendorExtension>>,
    fallback: Arc<dyn VendorExtension>,
}

impl VendorRegistry {
    pub fn new() -> Self {
        Self {
            extensions: HashMap::new(),
            fallback: Arc::new(GenericVendorExtension),
        }
    }

    pub fn register(&mut self, extension: Arc<dyn VendorExtension>) {
        info!(vendor_id = extension.vendor_id(), "Registered vendor extension");
        self.extensions
            .insert(extension.vendor_id().to_string(), extension);
    }

    /// The handler for a vendor id; the generic fallback when none matches.
    pub fn route(&self, vendor_id: &str) -> Arc<dyn VendorExtension> {
        self.extensions
            .get(vendor_id)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn registered_vendors(&self) -> Vec<String> {
        self.extensions.keys().cloned().collect()
    }
}

impl Default for VendorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoVendor;

    #[async_trait]
    impl VendorExtension for EchoVendor {
        fn vendor_id(&self) -> &str {
            "com.example.echo"
        }

        async fn handle(
            &self,
            _charge_point_id: &str,
            message_id: Option<&str>,
            data: Option<&str>,
        ) -> VendorReply {
            match message_id {
                Some("echo") => VendorReply::with_data(
                    VendorReplyStatus::Accepted,
                    data.unwrap_or_default(),
                ),
                Some(_) => VendorReply {
                    status: VendorReplyStatus::UnknownMessageId,
                    data: None,
                },
                None => VendorReply {
                    status: VendorReplyStatus::Rejected,
                    data: None,
                },
            }
        }
    }

    #[tokio::test]
    async fn routes_to_registered_vendor() {
        let mut registry = VendorRegistry::new();
        registry.register(Arc::new(EchoVendor));

        let reply = registry
            .route("com.example.echo")
            .handle("CP1", Some("echo"), Some("ping"))
            .await;
        assert_eq!(reply.status, VendorReplyStatus::Accepted);
        assert_eq!(reply.data.as_deref(), Some("ping"));

        let reply = registry
            .route("com.example.echo")
            .handle("CP1", Some("other"), None)
            .await;
        assert_eq!(reply.status, VendorReplyStatus::UnknownMessageId);
    }

    #[tokio::test]
    async fn unknown_vendor_falls_back_to_generic_accept() {
        let registry = VendorRegistry::new();
        let reply = registry
            .route("com.nobody.knows")
            .handle("CP1", None, Some("whatever"))
            .await;
        assert_eq!(reply.status, VendorReplyStatus::Accepted);
        assert!(reply.data.is_none());
    }
}
