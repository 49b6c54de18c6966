/// Stable index into an [`crate::arena::Arena`].
///
/// The reference implementation ties nodes together with strong parent
/// references kept alive by refcounting. Rust has no equivalent without
/// unsafe aliasing, so this rework represents the tree as a flat arena
/// addressed by index, with `parent` stored as
/// `Option<NodeId>` rather than an owning pointer. The arena is the only
/// owner; `NodeId` is `Copy` and carries no lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
