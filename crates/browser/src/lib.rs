//! Browser connection negotiation
//!
//! Produces a live Chrome DevTools Protocol session for a browser that is
//! either launched locally or already running somewhere else, possibly in
//! another network namespace such as a container.
//!
//! # Layout
//!
//! 1. **`cdp`**: WebSocket transport, request/response matching, page sessions
//! 2. **`discovery`**: `/json/version` lookup with the `Host` override and
//!    debugger URL rewriting
//! 3. **`launcher`**: local Chromium process management
//! 4. **`negotiator`**: picks the path for a [`ConnectionTarget`] and hands
//!    back a [`ResolvedSession`]

pub mod cdp;
pub mod discovery;
pub mod error;
pub mod launcher;
pub mod negotiator;
pub mod session;
pub mod target;

pub use cdp::{CDPClient, CDPError, CDPSession};
pub use discovery::{ManagementAddress, VersionInfo, DEFAULT_MANAGEMENT_PORT};
pub use error::ConnectionError;
pub use launcher::LaunchOptions;
pub use negotiator::{connect, Negotiator};
pub use session::ResolvedSession;
pub use target::ConnectionTarget;
