use std::sync::Arc;

use crate::error::Result;
use crate::host::shell::ShellHost;
use crate::host::{HostParams, RemoteHost};

pub enum Backend {
    Shell,
}

pub fn open_host(backend: Backend, p: HostParams) -> Result<Arc<dyn RemoteHost>> {
    match backend {
        Backend::Shell => Ok(Arc::new(ShellHost::new(p)?)),
    }
}
