//! Billing domain: plans, order ids, tenant subscription state, and the
//! callback trust-boundary types.

mod callback;
mod errors;
mod order_id;
mod plan;
mod tenant;

pub use callback::{CallbackPayload, VerificationResult, RESULT_CODE_SUCCESS};
pub use errors::BillingError;
pub use order_id::{MerchantOrderId, OrderIdGenerator};
pub use plan::{Plan, PlanCatalog, PlanId, BISNIS, LIFETIME, STARTER};
pub use tenant::{SubscriptionStatus, Tenant};
