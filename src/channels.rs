use crate::error::EegError;

/// Ordered canonical channel list for a device type. The order is the
/// order the checkpoints were trained on; source data is always normalized
/// back to it before conditioning.
#[derive(Debug, Clone, Copy)]
pub struct ChannelProfile {
    pub device_id: &'static str,
    pub channels: &'static [&'static str],
}

const PROFILES: &[ChannelProfile] = &[
    ChannelProfile {
        device_id: "muse",
        channels: &["T5", "T6", "F7", "F8"],
    },
    ChannelProfile {
        device_id: "hybrid_black",
        channels: &["Fz", "C3", "Cz", "C4", "Pz", "T5", "T6", "O1"],
    },
    ChannelProfile {
        device_id: "union10",
        channels: &["T5", "T6", "F7", "F8", "Fz", "C3", "Cz", "C4", "Pz", "O1"],
    },
    ChannelProfile {
        device_id: "total19",
        channels: &[
            "Fp1", "Fp2", "F7", "F3", "Fz", "F4", "F8", "T3", "C3", "Cz", "C4", "T4", "T5", "P3",
            "Pz", "P4", "T6", "O1", "O2",
        ],
    },
];

/// Electrode name aliases across 10-20 revisions and vendor montages.
/// First match in candidate order wins; same-name matches always win first.
const ALIASES: &[(&str, &[&str])] = &[
    ("T5", &["T7", "TP7", "P7", "TP9"]),
    ("T6", &["T8", "TP8", "P8", "TP10"]),
    ("F7", &["FT7", "AF7"]),
    ("F8", &["FT8", "AF8"]),
    ("O1", &["PO7"]),
];

pub fn profile_for(device_id: &str) -> Result<&'static ChannelProfile, EegError> {
    let wanted = device_id.trim().to_ascii_lowercase();
    PROFILES
        .iter()
        .find(|p| p.device_id == wanted)
        .ok_or_else(|| {
            let known: Vec<&str> = PROFILES.iter().map(|p| p.device_id).collect();
            EegError::invalid_input(format!(
                "unknown device '{device_id}', expected one of {known:?}"
            ))
        })
}

/// Assignment of every canonical profile channel to a source column index,
/// `None` meaning zero-fill (lenient mode only).
#[derive(Debug, Clone)]
pub struct ResolvedChannels {
    pub assignments: Vec<Option<usize>>,
    pub channel_names: Vec<String>,
}

/// Source-name normalization used for matching: uppercase, alphanumerics
/// only. `EEG Fp1` and `fp1` both resolve to `FP1`.
fn norm(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase()
}

fn find_source(source_norm: &[String], wanted: &str) -> Option<usize> {
    let key = norm(wanted);
    if let Some(i) = source_norm.iter().position(|s| *s == key) {
        return Some(i);
    }
    // Vendor exports often prefix channel names (`EEG_T5`); a suffix match
    // on the normalized form recovers those.
    source_norm.iter().position(|s| s.ends_with(&key))
}

/// Maps the canonical profile onto source-native channel names.
///
/// Per canonical channel: exact normalized match, then normalized suffix
/// match, then the alias table. In lenient mode unresolved channels are
/// zero-filled; otherwise resolution fails naming every missing channel.
/// Pure and deterministic: identical inputs yield identical assignments.
pub fn resolve_channels(
    profile: &ChannelProfile,
    source_names: &[String],
    lenient: bool,
) -> Result<ResolvedChannels, EegError> {
    let source_norm: Vec<String> = source_names.iter().map(|n| norm(n)).collect();
    let mut assignments = Vec::with_capacity(profile.channels.len());
    let mut missing = Vec::new();

    for &canonical in profile.channels {
        let mut found = find_source(&source_norm, canonical);
        if found.is_none() {
            if let Some((_, aliases)) = ALIASES.iter().find(|(name, _)| *name == canonical) {
                found = aliases
                    .iter()
                    .find_map(|alias| find_source(&source_norm, alias));
            }
        }
        if found.is_none() && !lenient {
            missing.push(canonical.to_string());
        }
        assignments.push(found);
    }

    if !missing.is_empty() {
        return Err(EegError::ChannelResolution {
            missing,
            present: source_names.to_vec(),
            expected: profile.channels.iter().map(|c| c.to_string()).collect(),
        });
    }

    Ok(ResolvedChannels {
        assignments,
        channel_names: profile.channels.iter().map(|c| c.to_string()).collect(),
    })
}

/// Validates an explicit physical channel order against the profile. The
/// order positionally names the source's data columns; a length mismatch
/// is rejected rather than guessed around.
pub fn validate_physical_order(
    profile: &ChannelProfile,
    order: &[String],
) -> Result<(), EegError> {
    if order.len() != profile.channels.len() {
        return Err(EegError::invalid_input(format!(
            "physical channel order has {} entries, profile '{}' expects {}",
            order.len(),
            profile.device_id,
            profile.channels.len()
        )));
    }
    Ok(())
}
