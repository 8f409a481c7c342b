use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use cowork_bridge::{ApprovalPrompt, ApprovalRequest};

/// Reports approval traffic on the terminal. The backend resolves
/// approvals itself, so nothing is sent back.
pub struct TerminalApprovalPrompt<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> TerminalApprovalPrompt<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> ApprovalPrompt for TerminalApprovalPrompt<W> {
    fn approval_requested(&self, request: &ApprovalRequest) {
        let mut out = lock_unpoisoned(&self.out);
        let tool = request.tool.as_deref().unwrap_or("tool");
        let _ = match (&request.message, &request.args) {
            (Some(message), _) => writeln!(out, "approval> {tool}: {message}"),
            (None, Some(args)) => writeln!(out, "approval> {tool} {args}"),
            (None, None) => writeln!(out, "approval> {tool}"),
        };
        let _ = out.flush();
    }

    fn tool_approved(&self, auto: bool) {
        let mut out = lock_unpoisoned(&self.out);
        let how = if auto { "auto-approved" } else { "approved" };
        let _ = writeln!(out, "approval> tool call {how}");
        let _ = out.flush();
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
