//! Plugin metadata probing.
//!
//! Determines which platform version a plugin archive targets, which in
//! turn decides the API JAR it is compiled against:
//!
//! ```text
//! plugin.yml ─┐
//! paper-plugin.yml ─┼─► first present descriptor ─► synonym keys ─┐
//! bungee.yml ─┘                                                   │ none
//!                          class names: v1_16_R3 ◄────────────────┘
//!                          class names: 1.16.5   ◄── none
//!                          default (1.20)        ◄── none
//! ```

mod descriptor;
mod detect;

pub use descriptor::{DESCRIPTOR_ENTRIES, PluginDescriptor, normalize_version, target_version};
pub use detect::{DetectionSource, MetadataProbe, PluginInfo};
