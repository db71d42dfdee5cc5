/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Synthetic graph generators used mainly for tests and benchmarks.

mod er;
pub use er::ErdosRenyi;
