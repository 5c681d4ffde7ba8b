// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Coarse test grouping.  Scenarios carry a group tag ("routing", "ndp",
//! ...); setting `FABRIC_TEST_GROUPS` to a comma-separated list restricts
//! a run to those groups.  Unset means everything runs.

/// Should tests in `group` run under the current environment?
pub fn enabled(group: &str) -> bool {
    match std::env::var("FABRIC_TEST_GROUPS") {
        Ok(val) => val.split(',').any(|g| g.trim() == group),
        Err(_) => true,
    }
}

/// Early-return helper for scenario functions: `skip_unless!("routing")`.
#[macro_export]
macro_rules! skip_unless {
    ($group:expr) => {
        if !$crate::group::enabled($group) {
            return Ok(());
        }
    };
}
