//! Daily maintenance entry in the system crontab.

use super::{ActionOutcome, apply_managed_block};
use crate::documents::ManagedBlock;
use crate::error::Result;
use crate::host::Host;
use std::path::Path;

pub const CRONTAB: &str = "/etc/crontab";

pub const MAINTENANCE_ENTRY: &str =
    "30 3 * * * root apt-get update && apt-get -y upgrade && apt-get -y autoremove";

pub fn schedule_maintenance(host: &dyn Host) -> Result<ActionOutcome> {
    let block = ManagedBlock::new("maintenance");
    apply_managed_block(host, Path::new(CRONTAB), &block, MAINTENANCE_ENTRY)
}
