#![allow(dead_code)]

//! In-memory FTP endpoint that counts session opens and releases.

use ftp_gateway::{ConnectionError, RemoteError, RemoteSession, SessionFactory};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ServerState {
    pub dirs: BTreeSet<String>,
    pub symlinks: BTreeMap<String, String>,
    pub files: BTreeMap<String, Vec<u8>>,
    pub opened: usize,
    pub released: usize,
    pub double_released: usize,
    pub finished_retrievals: usize,
    pub commands: Vec<String>,
    pub refuse_connections: bool,
}

impl ServerState {
    pub fn live(&self) -> usize {
        self.opened - self.released
    }
}

#[derive(Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryServer {
    pub fn new() -> Self {
        let server = Self::default();
        server.state().dirs.insert("/".to_string());
        server
    }

    pub fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap()
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.state().dirs.insert(path.to_string());
        self
    }

    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        self.state().files.insert(path.to_string(), data.to_vec());
        self
    }

    pub fn with_symlink(self, path: &str, target: &str) -> Self {
        self.state()
            .symlinks
            .insert(path.to_string(), target.to_string());
        self
    }

    pub fn refuse_connections(&self) {
        self.state().refuse_connections = true;
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).cloned()
    }

    pub fn commands(&self, verb: &str) -> Vec<String> {
        self.state()
            .commands
            .iter()
            .filter(|command| command.starts_with(verb))
            .cloned()
            .collect()
    }

    /// Every opened session was released exactly once.
    pub fn assert_balanced(&self) {
        let state = self.state();
        assert_eq!(state.opened, state.released, "sessions leaked");
        assert_eq!(state.double_released, 0, "session released twice");
    }

    /// Waits for background transfers to hand their sessions back.
    pub async fn wait_for_release(&self) {
        for _ in 0..500 {
            if self.state().live() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("sessions still open: {}", self.state().live());
    }
}

impl SessionFactory for MemoryServer {
    fn open(&self) -> Result<Box<dyn RemoteSession>, ConnectionError> {
        let mut state = self.state();
        if state.refuse_connections {
            return Err(ConnectionError::Connect {
                addr: "memory:21".to_string(),
                source: RemoteError::new(421, "Service not available"),
            });
        }
        state.opened += 1;
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
            cwd: "/".to_string(),
            closed: false,
        }))
    }
}

struct MemorySession {
    state: Arc<Mutex<ServerState>>,
    cwd: String,
    closed: bool,
}

impl MemorySession {
    fn lock(&self, command: String) -> MutexGuard<'_, ServerState> {
        let mut state = self.state.lock().unwrap();
        state.commands.push(command);
        state
    }

    fn resolve(&self, path: &str) -> String {
        let mut parts: Vec<&str> = if path.starts_with('/') {
            Vec::new()
        } else {
            self.cwd.split('/').filter(|s| !s.is_empty()).collect()
        };
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                segment => parts.push(segment),
            }
        }
        format!("/{}", parts.join("/"))
    }
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(index) => &path[..index],
    }
}

fn child_name<'a>(dir: &str, path: &'a str) -> Option<&'a str> {
    if path == "/" || parent(path) != dir {
        return None;
    }
    path.rsplit('/').next()
}

impl RemoteSession for MemorySession {
    fn pwd(&mut self) -> Result<String, RemoteError> {
        self.lock("PWD".to_string());
        Ok(self.cwd.clone())
    }

    fn cwd(&mut self, path: &str) -> Result<(), RemoteError> {
        let target = self.resolve(path);
        let state = self.lock(format!("CWD {}", target));
        if !state.dirs.contains(&target) {
            return Err(RemoteError::new(550, "Failed to change directory."));
        }
        drop(state);
        self.cwd = target;
        Ok(())
    }

    fn mkdir(&mut self, name: &str) -> Result<(), RemoteError> {
        let target = self.resolve(name);
        let mut state = self.lock(format!("MKD {}", target));
        if state.dirs.contains(&target)
            || state.files.contains_key(&target)
            || !state.dirs.contains(parent(&target))
        {
            return Err(RemoteError::new(550, "Create directory operation failed."));
        }
        state.dirs.insert(target);
        Ok(())
    }

    fn rm(&mut self, path: &str) -> Result<(), RemoteError> {
        let target = self.resolve(path);
        let mut state = self.lock(format!("DELE {}", target));
        match state.files.remove(&target) {
            Some(_) => Ok(()),
            None => Err(RemoteError::new(550, "Delete operation failed.")),
        }
    }

    fn list(&mut self, path: &str) -> Result<Vec<String>, RemoteError> {
        let target = self.resolve(path);
        let state = self.lock(format!("LIST {}", target));
        if !state.dirs.contains(&target) {
            return Err(RemoteError::new(450, "No such directory."));
        }

        let mut lines = vec![format!("total {}", state.files.len())];
        for dir in &state.dirs {
            if let Some(name) = child_name(&target, dir) {
                lines.push(format!("drwxr-xr-x 2 ftp ftp 4096 Nov 15 10:30 {}", name));
            }
        }
        for (file, data) in &state.files {
            if let Some(name) = child_name(&target, file) {
                lines.push(format!(
                    "-rw-r--r-- 1 ftp ftp {} Nov 15 10:30 {}",
                    data.len(),
                    name
                ));
            }
        }
        for (link, link_target) in &state.symlinks {
            if let Some(name) = child_name(&target, link) {
                lines.push(format!(
                    "lrwxrwxrwx 1 ftp ftp {} Nov 15 10:30 {} -> {}",
                    link_target.len(),
                    name,
                    link_target
                ));
            }
        }
        Ok(lines)
    }

    fn store(&mut self, path: &str, mut source: Box<dyn Read + Send>) -> Result<u64, RemoteError> {
        let target = self.resolve(path);
        {
            let state = self.lock(format!("STOR {}", target));
            if !state.dirs.contains(parent(&target)) {
                return Err(RemoteError::new(553, "Could not create file."));
            }
        }

        // Read outside the lock; the source may be fed by another task.
        let mut data = Vec::new();
        let result = source.read_to_end(&mut data);
        let written = data.len() as u64;
        self.state.lock().unwrap().files.insert(target, data);
        match result {
            Ok(_) => Ok(written),
            Err(_) => Err(RemoteError::new(426, "Connection closed; transfer aborted.")),
        }
    }

    fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let target = self.resolve(path);
        let state = self.lock(format!("RETR {}", target));
        state
            .files
            .get(&target)
            .cloned()
            .ok_or_else(|| RemoteError::new(550, "Failed to open file."))
    }

    fn open_retrieve(&mut self, name: &str) -> Result<Box<dyn Read + Send>, RemoteError> {
        let data = self.retrieve(name)?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn finish_retrieve(&mut self, _stream: Box<dyn Read + Send>) -> Result<(), RemoteError> {
        self.state.lock().unwrap().finished_retrievals += 1;
        Ok(())
    }

    fn logout(&mut self) -> Result<(), RemoteError> {
        self.lock("QUIT".to_string());
        Ok(())
    }

    fn disconnect(&mut self) {
        let mut state = self.state.lock().unwrap();
        if self.closed {
            state.double_released += 1;
        } else {
            self.closed = true;
            state.released += 1;
        }
    }
}
