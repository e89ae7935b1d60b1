mod archive;
mod contact_sms;
mod fanout;
mod responders;
mod status_push;
mod status_sync;

pub use archive::Archiver;
pub use contact_sms::{ContactSmsBroadcaster, SendContactSmsRequest, SendContactSmsResponse};
pub use fanout::settle_all;
pub use responders::{NotifyRespondersRequest, NotifyRespondersResponse, ResponderNotifier};
pub use status_push::{StatusPushNotifier, StatusPushOutcome};
pub use status_sync::{StatusSynchronizer, SyncOutcome};

use crate::{Caller, DispatchError};

/// Callable handlers require a verified caller before looking at their payload.
fn require_caller(caller: Option<&Caller>) -> Result<&Caller, DispatchError> {
    caller.ok_or(DispatchError::Unauthenticated)
}
