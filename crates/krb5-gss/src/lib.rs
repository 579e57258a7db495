#![cfg_attr(doc, doc = include_str!("../README.md"))]

#[macro_use]
extern crate tracing;

#[macro_use]
mod macros;

mod config;
mod context;
mod error;
mod flags;
mod framing;
mod key;
mod sequence;

pub mod establishment;
pub mod token;

pub use krb5_gss_crypto::{EncType, ProtocolGeneration};

pub use self::config::{ContextFlags, ContextParams, GssConfig, Role};
pub use self::context::{MessageProp, SecurityContext, Unwrapped};
pub use self::error::{GssError, GssErrorExt, GssErrorKind, GssResult};
pub use self::flags::{GssFlags, SupplementaryStatus, TokenFlags};
pub use self::framing::KRB5_MECH_OID;
pub use self::key::{KeySource, SessionKey};
pub use self::sequence::{ReplayWindow, SequenceCheck};
pub use self::token::Token;
