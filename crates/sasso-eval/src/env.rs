//! Scoped variable environment for the Sasso evaluator.

use crate::error::{EvalError, EvalResult};
use crate::value::Value;
use indexmap::IndexMap;

/// A single scope level.
pub type Scope = IndexMap<String, Value>;

/// One local frame. Frames opened by control flow at the top level let
/// assignments through to existing globals.
#[derive(Debug, Clone, Default)]
struct Frame {
    vars: Scope,
    flow: bool,
}

/// Frames hidden while a content block runs in its caller's view.
#[derive(Debug)]
pub struct Suspended {
    frames: Vec<Frame>,
    depth: usize,
    saved: Context,
}

/// Key of the root stylesheet's global scope.
pub const ROOT_MODULE: &str = "";

/// Sass treats `-` and `_` as the same character in names.
pub fn normalize(name: &str) -> String {
    name.replace('_', "-")
}

/// Visibility state saved when entering a callable body or a module.
#[derive(Debug, Clone)]
pub struct Context {
    floor: usize,
    active: String,
}

/// Scoped variable environment.
///
/// Every module has its own global scope. Local frames form one stack; the
/// frames below `floor` belong to callers and are invisible, so a function
/// body sees only its own locals and its module's globals.
#[derive(Debug, Clone)]
pub struct Environment {
    globals: IndexMap<String, Scope>,
    active: String,
    frames: Vec<Frame>,
    floor: usize,
    /// Bumped on every global write.
    version: u64,
}

impl Environment {
    /// Create an environment whose active global scope is the root module's.
    pub fn new() -> Self {
        let mut globals = IndexMap::new();
        globals.insert(ROOT_MODULE.to_string(), Scope::new());
        Self {
            globals,
            active: ROOT_MODULE.to_string(),
            frames: Vec::new(),
            floor: 0,
            version: 0,
        }
    }

    /// Push an empty local frame.
    pub fn enter_scope(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Push a frame for `@if`, `@each`, `@for` or `@while`.
    pub fn enter_flow_scope(&mut self) {
        self.frames.push(Frame {
            vars: Scope::new(),
            flow: true,
        });
    }

    /// Pop the innermost frame. A no-op when no frame is visible.
    pub fn exit_scope(&mut self) {
        if self.frames.len() > self.floor {
            self.frames.pop();
        }
    }

    /// Number of visible local frames.
    pub fn depth(&self) -> usize {
        self.frames.len() - self.floor
    }

    /// Total frames on the stack, including callers' frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Define a variable. Writes the global frame when `global` is set or no
    /// local frame is visible, else the innermost frame. With `default`, an
    /// already visible binding (innermost frame, else global) is left as is.
    pub fn define(&mut self, name: &str, value: Value, global: bool, default: bool) {
        let key = normalize(name);
        let to_global = global || self.depth() == 0;
        if default {
            let existing = if to_global {
                self.active_globals().and_then(|g| g.get(&key))
            } else {
                self.frames
                    .last()
                    .and_then(|frame| frame.vars.get(&key))
                    .or_else(|| self.active_globals().and_then(|g| g.get(&key)))
            };
            if existing.is_some_and(|v| !v.is_null()) {
                return;
            }
        }
        if to_global {
            self.version += 1;
            self.active_globals_mut().insert(key, value);
        } else if let Some(frame) = self.frames.last_mut() {
            frame.vars.insert(key, value);
        }
    }

    /// Assign from a variable statement: updates the innermost visible frame
    /// that already binds `name`, otherwise defines like [`define`]. When
    /// only flow frames are visible, an existing global is updated instead.
    ///
    /// [`define`]: Environment::define
    pub fn assign(&mut self, name: &str, value: Value) {
        let key = normalize(name);
        let floor = self.floor;
        if let Some(frame) = self.frames[floor..]
            .iter_mut()
            .rev()
            .find(|frame| frame.vars.contains_key(&key))
        {
            frame.vars.insert(key, value);
            return;
        }
        let only_flow = self.frames[floor..].iter().all(|frame| frame.flow);
        let global = only_flow && self.is_global_defined(&key);
        self.define(name, value, global, false);
    }

    /// Look up a variable in the visible frames, innermost first, then in
    /// the active global scope.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let key = normalize(name);
        self.frames[self.floor..]
            .iter()
            .rev()
            .find_map(|frame| frame.vars.get(&key))
            .or_else(|| self.active_globals().and_then(|g| g.get(&key)))
    }

    /// Like [`Environment::lookup`], but an unknown name is an error.
    pub fn get(&self, name: &str) -> EvalResult<Value> {
        self.lookup(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn is_global_defined(&self, name: &str) -> bool {
        self.active_globals()
            .is_some_and(|g| g.contains_key(&normalize(name)))
    }

    /// Changes whenever any global scope is written. Cached mixin output is
    /// only reused while this stays the same.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Record a global change made outside the environment, such as a
    /// write to a forwarded module variable.
    pub fn touch(&mut self) {
        self.version += 1;
    }

    /// Names bound in the active global scope, in definition order.
    pub fn global_names(&self) -> Vec<String> {
        self.active_globals()
            .map(|g| g.keys().cloned().collect())
            .unwrap_or_default()
    }

    // ══════════════════════════════════════════════════════════════════════
    // Module scopes
    // ══════════════════════════════════════════════════════════════════════

    /// Key of the module whose globals are active.
    pub fn active_module(&self) -> &str {
        &self.active
    }

    /// Hide all current frames and activate `module`'s globals. Used when a
    /// callable body or a module's top level starts running.
    pub fn enter_context(&mut self, module: &str) -> Context {
        self.globals.entry(module.to_string()).or_default();
        let saved = Context {
            floor: self.floor,
            active: std::mem::replace(&mut self.active, module.to_string()),
        };
        self.floor = self.frames.len();
        saved
    }

    /// Restore the visibility saved by [`Environment::enter_context`],
    /// dropping any frames left above it.
    pub fn leave_context(&mut self, saved: Context) {
        self.frames.truncate(self.floor);
        self.floor = saved.floor;
        self.active = saved.active;
    }

    /// Current visibility, for content blocks that must run in their
    /// caller's view.
    pub fn snapshot(&self) -> Context {
        Context {
            floor: self.floor,
            active: self.active.clone(),
        }
    }

    /// Temporarily remove frames above `depth` and restore `view`.
    pub fn suspend(&mut self, depth: usize, view: &Context) -> Suspended {
        let depth = depth.min(self.frames.len());
        let frames = self.frames.split_off(depth);
        let saved = Context {
            floor: self.floor,
            active: std::mem::replace(&mut self.active, view.active.clone()),
        };
        self.floor = view.floor.min(depth);
        Suspended {
            frames,
            depth,
            saved,
        }
    }

    /// Undo [`Environment::suspend`].
    pub fn resume(&mut self, suspended: Suspended) {
        self.frames.truncate(suspended.depth);
        self.frames.extend(suspended.frames);
        self.floor = suspended.saved.floor;
        self.active = suspended.saved.active;
    }

    /// A module's global scope.
    pub fn module_globals(&self, module: &str) -> Option<&Scope> {
        self.globals.get(module)
    }

    /// Set a global in a specific module, e.g. `ns.$x: value`.
    pub fn set_module_global(&mut self, module: &str, name: &str, value: Value) {
        self.version += 1;
        self.globals
            .entry(module.to_string())
            .or_default()
            .insert(normalize(name), value);
    }

    fn active_globals(&self) -> Option<&Scope> {
        self.globals.get(&self.active)
    }

    fn active_globals_mut(&mut self) -> &mut Scope {
        self.globals.entry(self.active.clone()).or_default()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
