use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("node {0:?} is declared twice")]
    DuplicateNode(String),
    #[error("link {0:?} -- {1:?} is declared twice")]
    DuplicateLink(String, String),
    #[error("link on node {0:?} loops back to itself")]
    SelfLoop(String),
    #[error("unknown node {0}")]
    UnknownNode(String),
    #[error("unknown vnf {0}")]
    UnknownVnf(String),
    #[error("vnf {0:?} is declared twice")]
    DuplicateVnf(String),
    #[error("{what} has {found} resource dimensions, expected {expected}")]
    ResourceDimension { what: String, found: usize, expected: usize },
    #[error("node #{1} is unreachable from node #{0}")]
    Unreachable(usize, usize),
    #[error("request #{2:02} got {0} hosting nodes for a chain of {1} vnfs")]
    OrderMismatch(usize, usize, usize),
    #[error("request #{0:02} got an empty path")]
    EmptyPath(usize),
    #[error("request #{0:02} steps from node #{1} to node #{2} without a link")]
    Unlinked(usize, usize, usize),
    #[error("request #{0:02} {1} at node #{2} instead of node #{3}")]
    WrongEndpoint(usize, &'static str, usize, usize),
    #[error("request #{0:02} applies vnfs {1:?} instead of {2:?}")]
    ChainMismatch(usize, Vec<usize>, Vec<usize>),
    #[error("request #{0:02} is assigned twice")]
    DuplicateAssignment(usize),
    #[error("request #{0:02} has no assignment")]
    MissingAssignment(usize),
    #[error("unknown request #{0:02}")]
    UnknownRequest(usize),
    #[error("invalid parameter {0}: {1}")]
    InvalidParameter(&'static str, String),
    #[error("no node has resources to host a vnf")]
    NoHostNode,
    #[error("the optimizer has already been executed")]
    AlreadyExecuted,
    #[error("chain #{0} failed: {1}")]
    ChainFailed(usize, String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}
