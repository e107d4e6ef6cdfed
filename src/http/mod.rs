//! HTTP/1.x request framing.
//!
//! Requests arrive as arbitrarily sized chunks off the socket. The connection
//! reassembles them without ever holding an unbounded amount in memory, hands
//! complete requests to the handler and writes the reply back.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection state machine
//! - **`parser`**: Extracts a request header from the staged bytes
//! - **`request`**: Parsed request header and request payload
//! - **`response`**: Status codes and handler dispositions
//! - **`reply`**: Serializes a disposition into response bytes
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Stage bytes, parse header, spill oversized bodies
//!        └──────┬──────┘
//!               │ bytes received == header + Content-Length
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Handler produces a disposition
//!        └──────┬───────────┘
//!               │ Reply built
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send reply to client
//!        └──────┬───────────┘
//!               │ Reply sent
//!               ├─ Keep-Alive with budget left → reset → Reading
//!               └─ otherwise → Closed
//! ```
//!
//! Every violation (oversized request, headerless overflow, malformed header,
//! bytes beyond the declared length, handler rejection) closes the connection
//! without a response.

pub mod connection;
pub mod parser;
pub mod reply;
pub mod request;
pub mod response;
