//! Per-attempt service context.

use crate::config::AfipConfig;
use crate::service::AfipService;
use crate::store::TicketStore;

/// Everything one authentication attempt needs, borrowed for its duration.
///
/// Built by the authenticator, passed explicitly through each step and
/// dropped when the attempt ends.
#[derive(Clone, Copy)]
pub struct ServiceContext<'a> {
    pub service: &'a AfipService,
    pub store: &'a dyn TicketStore,
    pub config: &'a AfipConfig,
}

impl<'a> ServiceContext<'a> {
    #[must_use]
    pub fn new(
        service: &'a AfipService,
        store: &'a dyn TicketStore,
        config: &'a AfipConfig,
    ) -> Self {
        Self {
            service,
            store,
            config,
        }
    }

    /// Conventional ticket path for this service and taxpayer.
    #[must_use]
    pub fn ticket_path(&self) -> String {
        self.config.ticket_path(self.service)
    }
}

impl std::fmt::Debug for ServiceContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("service", self.service)
            .field("store", &self.store.store_type())
            .field("cuit", &self.config.cuit)
            .finish()
    }
}
