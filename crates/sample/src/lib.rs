//! Sample event-sourced aggregates.
//!
//! Two flavours of the same protocol:
//! - [`TestAgg`] encodes its payloads to JSON keyed by a short type code
//! - [`User`] stores its typed payloads unchanged

pub mod test_agg;
pub mod user;

pub use test_agg::{
    TEST_AGG_CREATED_TYPE_CODE, TEST_AGG_FOO_UPDATED_TYPE_CODE, TestAgg, TestAggCodec,
    TestAggCreated, TestAggEvent, TestAggFooUpdated,
};
pub use user::{User, UserCreated, UserEvent, UserFirstNameUpdated, UserLastNameUpdated};
