#![allow(dead_code)]

use async_trait::async_trait;
use chatwatch_engine::backend::{Backend, BackendError, NavigationResult};
use chatwatch_engine::notifier::{NotificationEvent, Notifier, NotifyError};
use chatwatch_engine::protocol::{
    DescribeRequest, DomRequest, DomResponse, ErrorCode, NodeDetails, NodeId, QueryRequest,
};
use chatwatch_engine::resolution::chain::{
    CONVERSATION_LIST, LOGGED_IN_MARKER, NAME_LABEL, PHONE_NUMBER, QR_CODE_MARKER,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One row of the fake chat list.
#[derive(Debug, Clone, Default)]
pub struct FakeChat {
    /// `title` attribute of the name label; `None` renders no label element.
    pub title: Option<String>,
    pub text_nodes: Vec<String>,
    pub phone_title: Option<String>,
}

impl FakeChat {
    pub fn named(name: &str) -> Self {
        Self {
            title: Some(name.to_string()),
            text_nodes: vec![name.to_string(), "12:30".to_string(), "hey there".to_string()],
            phone_title: None,
        }
    }

    pub fn untitled(text_nodes: &[&str]) -> Self {
        Self {
            title: None,
            text_nodes: text_nodes.iter().map(|s| s.to_string()).collect(),
            phone_title: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FakeNode {
    Pane,
    Qr,
    Row(usize),
    Label(usize),
    Phone(usize),
}

#[derive(Debug)]
pub struct PageState {
    /// `None` means the chat list element is absent altogether.
    pub chats: Option<Vec<FakeChat>>,
    pub logged_in: bool,
    /// Selector (from the conversation-list chain) the page answers to.
    pub list_selector: &'static str,
    /// Selectors the page rejects as syntactically invalid.
    pub invalid_selectors: Vec<String>,
    pub fail_dom: bool,
    pub fail_navigate: bool,
    pub screenshot: Option<Vec<u8>>,
    pub launches: usize,
    pub closes: usize,
    pub navigations: Vec<String>,
    pub requests: Vec<DomRequest>,
    nodes: HashMap<NodeId, FakeNode>,
    next_id: u32,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            chats: Some(Vec::new()),
            logged_in: true,
            list_selector: CONVERSATION_LIST.selectors[0],
            invalid_selectors: Vec::new(),
            fail_dom: false,
            fail_navigate: false,
            screenshot: None,
            launches: 0,
            closes: 0,
            navigations: Vec::new(),
            requests: Vec::new(),
            nodes: HashMap::new(),
            next_id: 1,
        }
    }
}

impl PageState {
    fn register(&mut self, node: FakeNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    fn query(&mut self, req: QueryRequest) -> DomResponse {
        if self.invalid_selectors.iter().any(|s| s == &req.selector) {
            return DomResponse::Error {
                code: ErrorCode::InvalidSelector,
                message: format!("'{}' is not a valid selector", req.selector),
                id: None,
            };
        }

        let selector = req.selector.as_str();
        let found: Vec<FakeNode> = match req.scope {
            None => {
                if selector == self.list_selector {
                    let count = self.chats.as_ref().map_or(0, Vec::len);
                    (0..count).map(FakeNode::Row).collect()
                } else if selector == LOGGED_IN_MARKER.selectors[0] {
                    if self.logged_in && self.chats.is_some() {
                        vec![FakeNode::Pane]
                    } else {
                        vec![]
                    }
                } else if selector == QR_CODE_MARKER.selectors[0] && !self.logged_in {
                    vec![FakeNode::Qr]
                } else {
                    vec![]
                }
            }
            Some(scope) => {
                let Some(FakeNode::Row(row)) = self.nodes.get(&scope).copied() else {
                    return DomResponse::Error {
                        code: ErrorCode::StaleNode,
                        message: "scope is detached".into(),
                        id: Some(scope),
                    };
                };
                let chat = self.chat(row);
                if NAME_LABEL.selectors.iter().any(|s| *s == selector) && chat.title.is_some() {
                    vec![FakeNode::Label(row)]
                } else if selector == PHONE_NUMBER.selectors[0] && chat.phone_title.is_some() {
                    vec![FakeNode::Phone(row)]
                } else {
                    vec![]
                }
            }
        };

        let ids = found.into_iter().map(|n| self.register(n)).collect();
        DomResponse::Nodes { ids }
    }

    fn describe(&self, req: DescribeRequest) -> DomResponse {
        let Some(node) = self.nodes.get(&req.id).copied() else {
            return DomResponse::Error {
                code: ErrorCode::StaleNode,
                message: "unknown node".into(),
                id: Some(req.id),
            };
        };
        let mut details = NodeDetails {
            id: req.id,
            ..Default::default()
        };
        match node {
            FakeNode::Row(row) => {
                let chat = self.chat(row);
                details.text_nodes = chat.text_nodes.clone();
                details.text = chat.text_nodes.join("\n");
            }
            FakeNode::Label(row) => {
                let chat = self.chat(row);
                details.title = chat.title.clone();
                details.text = chat.title.clone().unwrap_or_default();
            }
            FakeNode::Phone(row) => {
                details.title = self.chat(row).phone_title.clone();
            }
            FakeNode::Pane | FakeNode::Qr => {}
        }
        DomResponse::Node { node: details }
    }

    fn chat(&self, row: usize) -> FakeChat {
        self.chats
            .as_ref()
            .and_then(|c| c.get(row))
            .cloned()
            .unwrap_or_default()
    }
}

/// Scriptable stand-in for a browser showing WhatsApp Web.
#[derive(Clone, Default)]
pub struct FakePage {
    pub state: Arc<Mutex<PageState>>,
}

impl FakePage {
    pub fn with_chats(names: &[&str]) -> Self {
        let page = Self::default();
        page.set_chats(names);
        page
    }

    pub fn set_chats(&self, names: &[&str]) {
        self.set_rows(names.iter().map(|n| FakeChat::named(n)).collect());
    }

    pub fn set_rows(&self, rows: Vec<FakeChat>) {
        self.state.lock().unwrap().chats = Some(rows);
    }

    pub fn remove_chat_list(&self) {
        self.state.lock().unwrap().chats = None;
    }

    pub fn set_fail_dom(&self, fail: bool) {
        self.state.lock().unwrap().fail_dom = fail;
    }

    pub fn update<F: FnOnce(&mut PageState)>(&self, f: F) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn launches(&self) -> usize {
        self.state.lock().unwrap().launches
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    pub fn boxed(&self) -> Box<dyn Backend> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl Backend for FakePage {
    async fn launch(&mut self) -> Result<(), BackendError> {
        self.state.lock().unwrap().launches += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        true
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_navigate {
            return Err(BackendError::Navigation(format!("cannot reach {}", url)));
        }
        state.navigations.push(url.to_string());
        Ok(NavigationResult {
            url: url.to_string(),
            title: "WhatsApp".into(),
            status: 200,
        })
    }

    async fn execute_dom(&mut self, request: DomRequest) -> Result<DomResponse, BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_dom {
            return Err(BackendError::ConnectionLost);
        }
        state.requests.push(request.clone());
        Ok(match request {
            DomRequest::Query(req) => state.query(req),
            DomRequest::Describe(req) => state.describe(req),
            DomRequest::Reset => {
                state.nodes.clear();
                DomResponse::Done
            }
        })
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        self.state
            .lock()
            .unwrap()
            .screenshot
            .clone()
            .ok_or_else(|| BackendError::NotSupported("screenshot".into()))
    }
}

/// Notifier that keeps every event it was handed.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub events: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<NotificationEvent> {
        self.events.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Notifier whose every delivery fails, counting attempts.
#[derive(Clone, Default)]
pub struct FailingNotifier {
    pub attempts: Arc<Mutex<usize>>,
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _event: &NotificationEvent) -> Result<(), NotifyError> {
        *self.attempts.lock().unwrap() += 1;
        Err(NotifyError::Delivery("smtp unreachable".into()))
    }
}
