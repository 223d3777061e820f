//! Rate limiting logic and state management.

mod clock;
mod counter;
mod identity;
mod limiter;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::CounterEntry;
pub use identity::{ClientKey, IdentityResolver, RequestContext};
pub use limiter::{
    Admission, FixedWindowLimiter, LimiterConfig, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW,
    RATE_LIMIT_KEY_PREFIX,
};
pub use store::{CounterStore, MemoryStore};
