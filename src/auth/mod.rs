//! OAuth token state handed over by the host.
//!
//! Acquisition happens elsewhere; this crate only decodes the stored state,
//! reports its remaining lifetime and renews it with the refresh token.

pub mod token_state;
