use std::os::fd::{AsRawFd, RawFd};

use os_pipe::{PipeReader, PipeWriter};

use crate::error::Result;

/// The pipe ends a stage gets as its base stdin/stdout, before its own
/// redirects are applied. `None` means inherit from the interpreter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageWiring {
    pub stdin: Option<RawFd>,
    pub stdout: Option<RawFd>,
}

/// All pipes of one pipeline; `pipes[k]` joins stage `k` to stage `k + 1`.
///
/// Every end is close-on-exec. The interpreter's copies are closed when the
/// chain is dropped, which must happen right after the last stage is forked
/// or downstream stages never see EOF.
#[derive(Debug)]
pub struct PipeChain {
    pipes: Vec<(PipeReader, PipeWriter)>,
}

impl PipeChain {
    /// Allocate the pipes for a pipeline of `stages` stages.
    pub fn for_stages(stages: usize) -> Result<Self> {
        let pipes = (1..stages)
            .map(|_| os_pipe::pipe())
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self { pipes })
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn wiring(&self, stage: usize) -> StageWiring {
        let stdin = stage
            .checked_sub(1)
            .and_then(|k| self.pipes.get(k))
            .map(|(reader, _)| reader.as_raw_fd());
        let stdout = self.pipes.get(stage).map(|(_, writer)| writer.as_raw_fd());
        StageWiring { stdin, stdout }
    }

    /// Every descriptor in the chain. A child closes all of them once its
    /// own ends are duplicated onto stdin/stdout.
    pub fn raw_fds(&self) -> Vec<RawFd> {
        self.pipes
            .iter()
            .flat_map(|(reader, writer)| [reader.as_raw_fd(), writer.as_raw_fd()])
            .collect()
    }
}
