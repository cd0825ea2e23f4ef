//! Wire protocol definitions for the RPC endpoint
//!
//! Every frame is a single JSON document.

pub mod classify;
pub mod codec;
pub mod method;
pub mod request;
pub mod response;

pub use classify::{classify, classify_method, classify_response};
pub use codec::{decode_response, encode_request, MAX_MESSAGE_SIZE};
pub use method::Method;
pub use request::{new_request_id, Request, Vars};
pub use response::{
    ClassifiedResponse, RawResponse, RelationOutcome, StatementResult, StatementStatus,
};
