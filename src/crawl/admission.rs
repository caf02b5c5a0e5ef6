// src/crawl/admission.rs
// =============================================================================
// The Admission Controller: may this crawl keep growing?
//
// A yes/no gate that compares the crawl's stored page count with its limit.
// There is no lock between asking and acting, so concurrent workers may all
// be granted and overshoot the limit a little. That is the accepted price of
// having no central scheduler.
//
// Denied is an answer, not an error. Only a failing store call is an error.
// =============================================================================

use std::sync::Arc;
use tracing::debug;

use crate::error::TransportError;
use crate::queue::ExecutionContext;
use crate::store::{PageRecord, PageStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Granted,
    Denied,
}

#[derive(Clone)]
pub struct AdmissionController {
    store: Arc<dyn PageStore>,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn PageStore>) -> Self {
        Self { store }
    }

    /// Asks whether the crawl is still below its page limit
    pub async fn authorize(&self, ctx: &ExecutionContext) -> Result<Admission, TransportError> {
        let granted = self.store.authorize(&ctx.execution_id, ctx.limit).await?;
        let admission = if granted {
            Admission::Granted
        } else {
            Admission::Denied
        };
        debug!(
            execution_id = %ctx.execution_id,
            limit = ctx.limit,
            ?admission,
            "authority to operate"
        );
        Ok(admission)
    }

    /// Writes `page` only if the crawl is below its limit at the moment of the call
    pub async fn admit_page(
        &self,
        ctx: &ExecutionContext,
        page: PageRecord,
    ) -> Result<Admission, TransportError> {
        let url = page.url.clone();
        match self.store.save(&ctx.execution_id, ctx.limit, page).await? {
            Some(reference) => {
                debug!(execution_id = %ctx.execution_id, %url, id = %reference.id, "page saved");
                Ok(Admission::Granted)
            }
            None => {
                debug!(execution_id = %ctx.execution_id, %url, "page skipped, limit reached");
                Ok(Admission::Denied)
            }
        }
    }
}
