// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Installed state must be fully removed when a test's scope closes,
//! regardless of how the test ended.

use common::MacAddr;
use conform::{tables, HarnessError, TestBed};
use fabric::profile;
use fabric::soft::SoftPipeline;
use mat::{EntryRequest, MatError, PipelineOps};

use crate::integration_tests::common::{get_testbed, TestResult};

fn total_occupancy(bed: &TestBed<SoftPipeline>) -> usize {
    profile::TABLES
        .iter()
        .map(|t| bed.backend().table_occupancy(t.name).unwrap())
        .sum()
}

fn next_hop() -> MacAddr {
    "02:78:39:45:b9:01".parse().unwrap()
}

// A scope holding a group and an entry that references it must roll back
// cleanly: the entry goes first, then the group.
#[test]
fn test_rollback_order() -> TestResult {
    let bed = get_testbed();
    let cfg = bed.config.clone();

    {
        let mut scope = bed.scope();
        tables::my_station::add(&mut scope, cfg.switch1.mac)?;
        tables::ecmp::add_group(&mut scope, 1, &[next_hop()])?;
        tables::route_v6::add_via_group(
            &mut scope,
            "fd00:1122:3344::/56".parse()?,
            1,
        )?;
        tables::l2_exact::add(&mut scope, next_hop(), cfg.port2)?;
        assert_eq!(scope.installed_count(), 4);
        assert_eq!(total_occupancy(&bed), 3);
        assert_eq!(bed.backend().group_count(), 1);
    }

    assert_eq!(total_occupancy(&bed), 0);
    assert_eq!(bed.backend().group_count(), 0);
    Ok(())
}

// Deleting a group out of order, while a route still references it, is
// refused by the device; the scope's reverse ordering avoids this.
#[test]
fn test_group_delete_out_of_order() -> TestResult {
    let bed = get_testbed();

    let mut scope = bed.scope();
    tables::ecmp::add_group(&mut scope, 1, &[next_hop()])?;
    tables::route_v6::add_via_group(
        &mut scope,
        "fd00:1122:3344::/56".parse()?,
        1,
    )?;

    let err = bed.backend().group_del(1).unwrap_err();
    assert!(matches!(err, MatError::Busy(_)));

    scope.rollback();
    assert_eq!(bed.backend().group_count(), 0);
    Ok(())
}

// State programmed before a failure is still removed when the scope
// closes.
#[test]
fn test_cleanup_after_failure() -> TestResult {
    let bed = get_testbed();
    let cfg = bed.config.clone();

    {
        let mut scope = bed.scope();
        tables::my_station::add(&mut scope, cfg.switch1.mac)?;
        tables::l2_exact::add(&mut scope, next_hop(), cfg.port2)?;
        assert_eq!(total_occupancy(&bed), 2);

        // a bad insert fails the "test" partway through programming
        let err = scope
            .insert(
                EntryRequest::table("ingress.l2.no_such_table")
                    .match_exact("dst_mac", next_hop())
                    .action(mat::ActionData::new(profile::ACT_NO_ACTION))
                    .build()
                    .unwrap(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Programming(MatError::NoSuchTable(_))
        ));
    }

    assert_eq!(total_occupancy(&bed), 0);
    Ok(())
}

// Rolling back explicitly and then dropping the scope must not attempt a
// second teardown.
#[test]
fn test_explicit_rollback() -> TestResult {
    let bed = get_testbed();
    let cfg = bed.config.clone();

    let mut scope = bed.scope();
    tables::my_station::add(&mut scope, cfg.switch1.mac)?;
    scope.rollback();
    assert_eq!(scope.installed_count(), 0);
    assert_eq!(total_occupancy(&bed), 0);
    drop(scope);
    assert_eq!(total_occupancy(&bed), 0);
    Ok(())
}
