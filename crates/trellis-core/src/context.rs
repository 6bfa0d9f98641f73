/// Privilege level a mutation runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionContext {
    super_user: bool,
}

impl ExecutionContext {
    /// Elevated context used by the post-import configuration script
    pub fn super_user() -> Self {
        Self { super_user: true }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_super_user(&self) -> bool {
        self.super_user
    }
}
