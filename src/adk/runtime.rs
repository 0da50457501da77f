// SPDX-License-Identifier: MIT

//! Drives async forms to completion for their blocking counterparts

use std::future::Future;
use std::io;

/// Run `future` to completion on a private current-thread runtime.
///
/// Refuses to run when the caller is already inside a tokio runtime, since
/// blocking there would stall the scheduler thread (and tokio would panic).
pub fn block_on<F: Future>(future: F) -> io::Result<F::Output> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            "blocking form called from inside an async runtime; use the async form instead",
        ));
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}
