//! Gas sponsorship (paymaster) routing

pub mod router;
pub mod transport;

pub use router::{SendOutcome, SkipReason, SponsorshipOutcome, SponsorshipRouter};
pub use transport::{HttpSponsor, SponsorError, SponsorRequest, SponsorTransport, UserOperation};
