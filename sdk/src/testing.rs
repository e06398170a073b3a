//! In-memory collaborators for driving the engine without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;

use crate::client::{ArticleApi, ClientError, CommentApi};
use crate::session::{MemorySession, Navigator, SessionGuard};
use crate::types::{
    ArticleLikeResponse, Comment, CommentAuthor, CommentLikeResponse, CommentPage,
    CreateCommentRequest, UserIdentity,
};
use crate::ws::{ChannelHandle, Transport, TransportEvent, WsError};

/// Navigator that records every redirect.
#[derive(Debug, Default)]
pub(crate) struct RecordingNavigator {
    messages: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("lock").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self, message: &str) {
        self.messages
            .lock()
            .expect("lock")
            .push(message.to_string());
    }
}

pub(crate) fn user() -> UserIdentity {
    UserIdentity {
        id: "u1".to_string(),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        role: "reader".to_string(),
    }
}

pub(crate) fn other_author() -> CommentAuthor {
    CommentAuthor {
        id: "u2".to_string(),
        username: "bob".to_string(),
        email: "bob@example.com".to_string(),
    }
}

/// A signed-in session for user `u1` with token `tok`.
pub(crate) fn mock_session() -> (SessionGuard, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::default());
    let store = Arc::new(MemorySession::signed_in("tok", user()));
    (SessionGuard::new(store, navigator.clone()), navigator)
}

/// A confirmed comment as the server would send it.
pub(crate) fn server_comment(
    id: &str,
    article: &str,
    author: CommentAuthor,
    content: &str,
    parent: Option<&str>,
) -> Comment {
    Comment::provisional(
        id,
        article,
        author,
        content,
        parent.map(str::to_string),
        Utc::now(),
    )
}

/// What the next `open` call does.
#[derive(Debug)]
pub(crate) enum Script {
    Accept,
    Reject(WsError),
    Hang,
}

/// Server side of an accepted mock channel.
#[derive(Debug)]
pub(crate) struct MockPeer {
    pub to_client: mpsc::Sender<TransportEvent>,
    pub from_client: mpsc::Receiver<String>,
}

impl MockPeer {
    pub(crate) async fn send(&self, frame: &str) {
        self.to_client
            .send(TransportEvent::Frame(frame.to_string()))
            .await
            .expect("client listening");
    }

    pub(crate) async fn close(&self) {
        self.to_client
            .send(TransportEvent::Closed(Some("server restart".to_string())))
            .await
            .expect("client listening");
    }
}

#[derive(Debug)]
struct TransportInner {
    script: Mutex<VecDeque<Script>>,
    urls: Mutex<Vec<String>>,
    peers: mpsc::UnboundedSender<MockPeer>,
}

/// Scripted transport. Accepts by default once the script runs out.
#[derive(Debug, Clone)]
pub(crate) struct MockTransport {
    inner: Arc<TransportInner>,
}

impl MockTransport {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let transport = Self {
            inner: Arc::new(TransportInner {
                script: Mutex::new(VecDeque::new()),
                urls: Mutex::new(Vec::new()),
                peers,
            }),
        };
        (transport, rx)
    }

    pub(crate) fn push(&self, step: Script) {
        self.inner.script.lock().expect("lock").push_back(step);
    }

    pub(crate) fn opened(&self) -> usize {
        self.inner.urls.lock().expect("lock").len()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.inner.urls.lock().expect("lock").clone()
    }
}

impl Transport for MockTransport {
    async fn open(&self, url: &str) -> Result<ChannelHandle, WsError> {
        self.inner.urls.lock().expect("lock").push(url.to_string());
        let step = self
            .inner
            .script
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or(Script::Accept);

        match step {
            Script::Accept => {
                let (outbound, from_client) = mpsc::channel(64);
                let (to_client, inbound) = mpsc::channel(64);
                let _ = self.inner.peers.send(MockPeer {
                    to_client,
                    from_client,
                });
                Ok(ChannelHandle { outbound, inbound })
            }
            Script::Reject(err) => Err(err),
            Script::Hang => {
                std::future::pending::<()>().await;
                Err(WsError::Timeout)
            }
        }
    }
}

/// In-memory comment and article store acting as the REST collaborator.
#[derive(Debug)]
pub(crate) struct MockApi {
    user_id: String,
    comments: Mutex<HashMap<String, Comment>>,
    pages: Mutex<Vec<CommentPage>>,
    create_failures: Mutex<VecDeque<ClientError>>,
    creates: Mutex<Vec<CreateCommentRequest>>,
    next_id: AtomicUsize,
    comment_like_calls: AtomicUsize,
    article_like_calls: AtomicUsize,
    article_like: Mutex<ArticleLikeResponse>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            user_id: user().id,
            comments: Mutex::new(HashMap::new()),
            pages: Mutex::new(Vec::new()),
            create_failures: Mutex::new(VecDeque::new()),
            creates: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            comment_like_calls: AtomicUsize::new(0),
            article_like_calls: AtomicUsize::new(0),
            article_like: Mutex::new(ArticleLikeResponse {
                like_count: 5,
                user_liked: false,
            }),
        }
    }
}

impl MockApi {
    /// Registers a listing page; pages are served in insertion order.
    pub(crate) fn add_page(&self, page: CommentPage) {
        let mut comments = self.comments.lock().expect("lock");
        for comment in &page.comments {
            comments.insert(comment.id.clone(), comment.clone());
        }
        self.pages.lock().expect("lock").push(page);
    }

    pub(crate) fn store(&self, comment: Comment) {
        self.comments
            .lock()
            .expect("lock")
            .insert(comment.id.clone(), comment);
    }

    pub(crate) fn fail_next_create(&self, err: ClientError) {
        self.create_failures.lock().expect("lock").push_back(err);
    }

    pub(crate) fn creates(&self) -> Vec<CreateCommentRequest> {
        self.creates.lock().expect("lock").clone()
    }

    pub(crate) fn comment_like_calls(&self) -> usize {
        self.comment_like_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn article_like_calls(&self) -> usize {
        self.article_like_calls.load(Ordering::SeqCst)
    }
}

impl CommentApi for MockApi {
    async fn list_by_article(
        &self,
        article_id: &str,
        page: u32,
        _limit: u32,
    ) -> Result<CommentPage, ClientError> {
        let pages = self.pages.lock().expect("lock");
        let index = usize::try_from(page.saturating_sub(1)).expect("page index");
        pages
            .get(index)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("article {} page {}", article_id, page)))
    }

    async fn create(&self, request: &CreateCommentRequest) -> Result<Comment, ClientError> {
        self.creates.lock().expect("lock").push(request.clone());
        if let Some(err) = self.create_failures.lock().expect("lock").pop_front() {
            return Err(err);
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let prefix = if request.parent_comment_id.is_some() {
            "r"
        } else {
            "c"
        };
        let comment = server_comment(
            &format!("{}{}", prefix, n),
            &request.article_id,
            user().as_author(),
            &request.content,
            request.parent_comment_id.as_deref(),
        );
        self.store(comment.clone());
        Ok(comment)
    }

    async fn update(&self, comment_id: &str, content: &str) -> Result<Comment, ClientError> {
        let mut comments = self.comments.lock().expect("lock");
        let comment = comments
            .get_mut(comment_id)
            .ok_or_else(|| ClientError::NotFound(comment_id.to_string()))?;
        comment.content = content.to_string();
        comment.is_edited = true;
        comment.edited_at = Some(Utc::now());
        Ok(comment.clone())
    }

    async fn delete(&self, comment_id: &str) -> Result<(), ClientError> {
        self.comments
            .lock()
            .expect("lock")
            .remove(comment_id)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(comment_id.to_string()))
    }

    async fn toggle_like(&self, comment_id: &str) -> Result<CommentLikeResponse, ClientError> {
        self.comment_like_calls.fetch_add(1, Ordering::SeqCst);
        let mut comments = self.comments.lock().expect("lock");
        let comment = comments
            .get_mut(comment_id)
            .ok_or_else(|| ClientError::NotFound(comment_id.to_string()))?;

        let user_liked = if comment.likes.remove(&self.user_id) {
            false
        } else {
            comment.likes.insert(self.user_id.clone());
            true
        };
        comment.like_count = Some(u32::try_from(comment.likes.len()).expect("count"));

        Ok(CommentLikeResponse {
            message: "ok".to_string(),
            comment: comment.clone(),
            user_liked,
        })
    }

    async fn list_replies(
        &self,
        comment_id: &str,
        _page: u32,
        _limit: u32,
    ) -> Result<CommentPage, ClientError> {
        let comments = self.comments.lock().expect("lock");
        let mut replies: Vec<Comment> = comments
            .values()
            .filter(|c| c.parent_comment.as_deref() == Some(comment_id))
            .cloned()
            .collect();
        replies.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = replies.len() as u64;

        Ok(CommentPage {
            comments: replies,
            current_page: 1,
            total_pages: 1,
            total_comments: total,
        })
    }
}

impl ArticleApi for MockApi {
    async fn toggle_article_like(&self, _article_id: &str) -> Result<ArticleLikeResponse, ClientError> {
        self.article_like_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.article_like.lock().expect("lock");
        if state.user_liked {
            state.like_count = state.like_count.saturating_sub(1);
            state.user_liked = false;
        } else {
            state.like_count += 1;
            state.user_liked = true;
        }
        Ok(*state)
    }
}
