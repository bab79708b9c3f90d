// # gwddnsd - gwddns binaries
//
// ⚠️ ARCHITECTURAL CONSTRAINTS ⚠️
//
// - This is a THIN integration layer ONLY
// - DO NOT add health, topology, diffing or publishing logic here
// - All reconciliation logic MUST be in gwddns-core
// - Configuration is via environment variables ONLY; flags select per-run
//   behavior
//
// Two binaries share this library:
//
// - `gwddns`: one reconciliation run, then exit (cron or watcher triggered)
// - `gwddns-watch`: long-running gateway watcher that starts `gwddns
//   --force-update --reason=Gateway-Event` whenever gateway health changes
//
// ## Example
//
// ```bash
// export GWDDNS_ZONE=example.org.
// export GWDDNS_RECORD_NAME=home.example.org.
// export GWDDNS_PDNS_API_URL=https://pdns-api/api/v1
// export GWDDNS_PDNS_API_KEY=your_api_key
// export GWDDNS_ALLOWED_INTERFACES=em0,ixl2
//
// gwddns --dry-run
// gwddns-watch --interval-secs 5
// ```

pub mod app;
pub mod cli;
pub mod env;
pub mod exit;
pub mod logging;
pub mod trigger;

pub use exit::GwddnsExitCode;
