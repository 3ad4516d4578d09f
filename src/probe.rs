use camino::{Utf8Path, Utf8PathBuf};

/// What kind of filesystem entry a caller accepts for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    File,
    Dir,
}

impl Expect {
    fn accepts(&self, path: &Utf8Path) -> bool {
        match self {
            Expect::File => path.is_file(),
            Expect::Dir => path.is_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Found(Utf8PathBuf),
    NotFound { tried: Vec<Utf8PathBuf> },
}

impl Probe {
    pub fn found(self) -> Option<Utf8PathBuf> {
        match self {
            Probe::Found(path) => Some(path),
            Probe::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Probe::Found(_))
    }
}

/// Existence checks over an ordered list of candidate paths.
pub struct PathProbe;

impl PathProbe {
    /// Returns the first candidate that exists as the expected entry kind.
    /// Absence is a normal outcome, never an error.
    pub fn resolve<I, P>(candidates: I, expect: Expect) -> Probe
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Utf8Path>,
    {
        let mut tried = Vec::new();
        for candidate in candidates {
            let candidate = candidate.as_ref();
            if expect.accepts(candidate) {
                return Probe::Found(candidate.to_path_buf());
            }
            tried.push(candidate.to_path_buf());
        }
        Probe::NotFound { tried }
    }

    /// Same as [`PathProbe::resolve`] with each candidate joined onto `base`.
    pub fn resolve_in<I, P>(base: &Utf8Path, candidates: I, expect: Expect) -> Probe
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Utf8Path>,
    {
        Self::resolve(
            candidates
                .into_iter()
                .map(|candidate| base.join(candidate.as_ref())),
            expect,
        )
    }
}
