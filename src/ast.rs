/// One external program invocation inside a pipeline.
///
/// `argv[0]` is the program name. Pipe descriptors are never stored here;
/// they are assigned when the stage is spawned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    pub argv: Vec<String>,
    pub input: Option<String>,
    pub output: Option<String>,
}

impl Stage {
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// The same stage with its first word removed, redirects kept.
    ///
    /// Used by `start`/`run`, whose own name occupies `argv[0]`.
    pub fn without_command_word(&self) -> Stage {
        Stage {
            argv: self.args().to_vec(),
            input: self.input.clone(),
            output: self.output.clone(),
        }
    }

    pub fn has_redirects(&self) -> bool {
        self.input.is_some() || self.output.is_some()
    }
}

/// An ordered, non-empty chain of stages joined by pipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn first(&self) -> &Stage {
        &self.stages[0]
    }

    /// Number of pipes needed to connect the stages.
    pub fn pipe_count(&self) -> usize {
        self.stages.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(words: &[&str]) -> Stage {
        Stage {
            argv: words.iter().map(|w| w.to_string()).collect(),
            ..Stage::default()
        }
    }

    #[test]
    fn command_word_is_skipped_by_name() {
        let mut s = stage(&["start", "sleep", "5"]);
        s.output = Some("log.txt".into());
        let inner = s.without_command_word();
        assert_eq!(inner.program(), Some("sleep"));
        assert_eq!(inner.args(), ["5"]);
        assert_eq!(inner.output.as_deref(), Some("log.txt"));
    }

    #[test]
    fn skipping_the_only_word_leaves_an_empty_stage() {
        let inner = stage(&["run"]).without_command_word();
        assert!(inner.argv.is_empty());
        assert_eq!(inner.program(), None);
        assert!(inner.args().is_empty());
    }

    #[test]
    fn pipe_count_is_one_less_than_stages() {
        let pipeline = Pipeline {
            stages: vec![stage(&["ls"]), stage(&["sort"]), stage(&["uniq"])],
        };
        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.pipe_count(), 2);
        assert_eq!(pipeline.first().program(), Some("ls"));
    }
}
