#![allow(dead_code)]

use serde_json::Value;
use ssb_runtime_host::browser::{CommandRunner, HandlerResolver, Invocation, Opener};
use ssb_runtime_host::error::OpenError;
use ssb_runtime_host::host::{encode_message, read_frame, MAX_FROM_BROWSER};
use ssb_runtime_host::IdentityInfo;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::env;
use std::io::Cursor;
use std::rc::Rc;

/// Env guard that restores previous env vars on drop.
pub struct EnvGuard {
    old: HashMap<String, Option<String>>,
}

impl EnvGuard {
    pub fn set(vars: &[(&str, String)]) -> Self {
        let mut old = HashMap::new();
        for (k, v) in vars {
            old.insert((*k).to_string(), env::var(k).ok());
            env::set_var(k, v);
        }
        Self { old }
    }

    pub fn unset(keys: &[&str]) -> Self {
        let mut old = HashMap::new();
        for k in keys {
            old.insert((*k).to_string(), env::var(k).ok());
            env::remove_var(k);
        }
        Self { old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, prev) in self.old.drain() {
            match prev {
                Some(v) => env::set_var(k, v),
                None => env::remove_var(k),
            }
        }
    }
}

pub fn example_identity() -> IdentityInfo {
    IdentityInfo {
        app_version: "1.2.3".into(),
        app_id: "com.example.app".into(),
        app_display_name: "Example".into(),
        app_short_name: "Ex".into(),
    }
}

/// Concatenate framed messages into one input stream.
pub fn frames(messages: &[Value]) -> Vec<u8> {
    messages
        .iter()
        .flat_map(|m| encode_message(m).unwrap())
        .collect()
}

/// Decode every frame the host wrote.
pub fn replies(output: &[u8]) -> Vec<Value> {
    let mut cur = Cursor::new(output);
    let mut out = Vec::new();
    while let Some(v) = read_frame(&mut cur, MAX_FROM_BROWSER).unwrap() {
        out.push(v);
    }
    out
}

/// Opener that succeeds or fails on demand and remembers every URL.
#[derive(Default)]
pub struct ScriptedOpener {
    pub fail: Cell<bool>,
    pub opened: RefCell<Vec<String>>,
}

impl ScriptedOpener {
    pub fn failing() -> Self {
        let o = Self::default();
        o.fail.set(true);
        o
    }
}

impl Opener for ScriptedOpener {
    fn open(&self, url: &str) -> Result<(), OpenError> {
        self.opened.borrow_mut().push(url.to_string());
        if self.fail.get() {
            Err(OpenError::Unsupported)
        } else {
            Ok(())
        }
    }
}

/// Resolver that counts how often it is asked.
pub struct CountingResolver {
    pub answer: Option<String>,
    pub calls: Rc<Cell<usize>>,
}

impl HandlerResolver for CountingResolver {
    fn resolve(&self) -> Option<String> {
        self.calls.set(self.calls.get() + 1);
        self.answer.clone()
    }
}

/// Runner that records invocations instead of spawning anything.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    pub calls: Rc<RefCell<Vec<Invocation>>>,
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), OpenError> {
        self.calls.borrow_mut().push(invocation.clone());
        Ok(())
    }
}
