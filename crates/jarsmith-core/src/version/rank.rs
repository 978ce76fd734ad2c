//! Best-match ranking of candidate artifacts against a target version.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use super::parse::parse;
use super::types::Version;

/// A discovered artifact paired with the version parsed from its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub version: Version,
}

impl Candidate {
    /// Build a candidate from a file path, or `None` if its name carries no
    /// recognizable version.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let version = parse(&file_name(&path))?;
        Some(Self { path, version })
    }

    /// File name of the candidate, for logging.
    pub fn file_name(&self) -> String {
        file_name(&self.path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Order two candidates by how well they fit `target`; `Less` is better.
fn compare(a: &Candidate, b: &Candidate, target: &Version) -> Ordering {
    let exact = |c: &Candidate| c.version == *target;
    let compatible = |c: &Candidate| c.version.is_compatible_with(target);

    exact(b)
        .cmp(&exact(a))
        .then_with(|| compatible(b).cmp(&compatible(a)))
        .then_with(|| {
            a.version
                .priority_score(target)
                .cmp(&b.version.priority_score(target))
        })
        .then_with(|| b.version.cmp(&a.version))
}

/// Sort candidates from best to worst fit for `target`.
pub fn rank<'a>(candidates: &'a [Candidate], target: &Version) -> Vec<&'a Candidate> {
    let mut ranked: Vec<&Candidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| compare(a, b, target));
    ranked
}

/// Pick the candidate that best fits `target`.
///
/// Exact matches win, then compatible versions, then the lowest priority
/// score, then the newest version.
pub fn best_match<'a>(candidates: &'a [Candidate], target: &Version) -> Option<&'a Candidate> {
    let ranked = rank(candidates, target);
    let best = *ranked.first()?;

    tracing::info!(
        "Selected {} (version {}) for target {}",
        best.file_name(),
        best.version,
        target
    );
    for alternative in ranked.iter().skip(1).take(3) {
        tracing::debug!(
            "  alternative {} (version {}, priority {})",
            alternative.file_name(),
            alternative.version,
            alternative.version.priority_score(target)
        );
    }

    Some(best)
}

/// Pick the file whose name carries the greatest version.
///
/// Files without a recognizable version sort after every versioned file, so
/// the first file is still returned when none of them parse.
pub fn newest(files: &[PathBuf]) -> Option<&PathBuf> {
    files.iter().min_by(|a, b| {
        let va = parse(&file_name(a));
        let vb = parse(&file_name(b));
        match (va, vb) {
            (Some(va), Some(vb)) => vb.cmp(&va),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(names: &[&str]) -> Vec<Candidate> {
        names
            .iter()
            .filter_map(|name| Candidate::from_path(PathBuf::from("/libs").join(name)))
            .collect()
    }

    fn target(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn best(names: &[&str], t: &str) -> Option<String> {
        let list = candidates(names);
        best_match(&list, &target(t)).map(|c| c.file_name())
    }

    #[test]
    fn test_unparseable_names_are_dropped() {
        let list = candidates(&["spigot-api.jar", "bukkit-1.12.2.jar"]);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].version.to_string(), "1.12.2");
    }

    #[test]
    fn test_exact_match_wins() {
        assert_eq!(
            best(
                &["spigot-api-1.19.jar", "spigot-api-1.20.jar", "spigot-api-1.21.jar"],
                "1.20"
            ),
            Some("spigot-api-1.20.jar".to_string())
        );
    }

    #[test]
    fn test_newer_incompatible_beats_older_incompatible() {
        let list = candidates(&["spigot-api-1.16.jar", "spigot-api-1.23.jar"]);
        let t = target("1.20");
        assert_eq!(list[0].version.distance_to(&t), 400);
        assert_eq!(list[1].version.distance_to(&t), 300);

        let chosen = best_match(&list, &t).unwrap();
        assert_eq!(chosen.file_name(), "spigot-api-1.23.jar");
    }

    #[test]
    fn test_compatible_beats_incompatible() {
        assert_eq!(
            best(&["spigot-api-1.12.2.jar", "spigot-api-1.18.2.jar"], "1.20"),
            Some("spigot-api-1.18.2.jar".to_string())
        );
    }

    #[test]
    fn test_lower_priority_score_wins_among_compatible() {
        // 1.19 scores 90, 1.21 scores 110
        assert_eq!(
            best(&["spigot-api-1.21.jar", "spigot-api-1.19.jar"], "1.20"),
            Some("spigot-api-1.19.jar".to_string())
        );
    }

    #[test]
    fn test_tie_breaks_on_newest() {
        // Same minor as the target but no exact match: both score by patch distance.
        assert_eq!(
            best(&["spigot-api-1.20.1.jar", "spigot-api-1.20.5.jar"], "1.20.3"),
            Some("spigot-api-1.20.5.jar".to_string())
        );
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let names = [
            "spigot-api-1.8.8.jar",
            "spigot-api-1.12.2.jar",
            "spigot-api-1.16.5.jar",
            "spigot-api-1.20.4.jar",
            "spigot-api-1.21.jar",
        ];
        let list = candidates(&names);
        let mut reversed = list.clone();
        reversed.reverse();

        let t = target("1.17");
        let a: Vec<_> = rank(&list, &t).iter().map(|c| c.file_name()).collect();
        let b: Vec<_> = rank(&reversed, &t).iter().map(|c| c.file_name()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_best_match_empty() {
        assert_eq!(best(&[], "1.20"), None);
    }

    #[test]
    fn test_newest_prefers_highest_version() {
        let files = vec![
            PathBuf::from("spigot-api.jar"),
            PathBuf::from("spigot-api-1.16.5.jar"),
            PathBuf::from("spigot-api-1.21.jar"),
        ];
        assert_eq!(newest(&files), Some(&PathBuf::from("spigot-api-1.21.jar")));
    }

    #[test]
    fn test_newest_falls_back_to_first_unversioned() {
        let files = vec![PathBuf::from("bukkit.jar"), PathBuf::from("spigot.jar")];
        assert_eq!(newest(&files), Some(&PathBuf::from("bukkit.jar")));
        assert_eq!(newest(&[]), None);
    }
}
