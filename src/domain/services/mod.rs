mod quota_policy;

pub use quota_policy::{QuotaDecision, QuotaPolicy, HOURLY_BURST_MULTIPLIER};
