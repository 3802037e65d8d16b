//! Streaming HTML attribute rewriting.
//!
//! # Responsibilities
//! - Rewrite upstream-origin URLs in link-like attributes to the proxy origin
//! - Clamp links to the upstream's not-found page to `/`
//! - Stream: output chunks are produced as input chunks arrive
//!
//! # Design Decisions
//! - `lol_html` runs on a blocking worker fed from the upstream stream; its
//!   output flows through a bounded channel into the response body
//! - Dropping the response body (client disconnect) closes the channel, which
//!   stops the worker and drops the upstream stream
//! - A rewriter failure discards the partial output of the failing step and
//!   forwards every input byte not yet emitted, then the rest of the body,
//!   unmodified rather than failing the response

use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::sync::Arc;

use axum::body::{Body, BodyDataStream, Bytes};
use futures_util::StreamExt;
use lol_html::errors::RewritingError;
use lol_html::html_content::Element;
use lol_html::{element, HtmlRewriter, MemorySettings, OutputSink, Settings};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::observability::metrics;
use crate::rewrite::context::RewriteContext;

/// Output chunks buffered between the worker and the response body.
const OUTPUT_BUFFER: usize = 16;

/// Parsing buffer allocated up front for each document.
const PREALLOCATED_BUFFER: usize = 1024;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type Chunk = Result<Bytes, io::Error>;
type Output = Rc<RefCell<Vec<u8>>>;

/// An incremental transform writing into a shared output buffer.
trait ChunkRewriter {
    fn write(&mut self, chunk: &[u8]) -> Result<(), RewritingError>;
    fn end(self) -> Result<(), RewritingError>;
}

impl<O: OutputSink> ChunkRewriter for HtmlRewriter<'_, O> {
    fn write(&mut self, chunk: &[u8]) -> Result<(), RewritingError> {
        HtmlRewriter::write(self, chunk)
    }

    fn end(self) -> Result<(), RewritingError> {
        HtmlRewriter::end(self)
    }
}

/// Rewrite an HTML body stream. Must be called within a Tokio runtime.
pub fn rewrite_html_body(body: Body, ctx: Arc<RewriteContext>) -> Body {
    stream_through(body, move |output: Output| {
        HtmlRewriter::new(settings(&ctx), move |c: &[u8]| output.borrow_mut().extend_from_slice(c))
    })
}

/// Run the rewriter built by `make` on a blocking worker over `body`.
fn stream_through<R, F>(body: Body, make: F) -> Body
where
    R: ChunkRewriter,
    F: FnOnce(Output) -> R + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Chunk>(OUTPUT_BUFFER);
    let handle = Handle::current();
    let input = body.into_data_stream();

    tokio::task::spawn_blocking(move || {
        let output = Rc::new(RefCell::new(Vec::new()));
        let rewriter = make(Rc::clone(&output));
        run_rewriter(rewriter, &output, handle, input, tx);
    });

    Body::from_stream(futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }))
}

enum Next {
    Chunk(Bytes),
    Failed(axum::Error),
    End,
    Cancelled,
}

fn next_chunk(handle: &Handle, input: &mut BodyDataStream, tx: &mpsc::Sender<Chunk>) -> Next {
    handle.block_on(async {
        tokio::select! {
            chunk = input.next() => match chunk {
                Some(Ok(bytes)) => Next::Chunk(bytes),
                Some(Err(e)) => Next::Failed(e),
                None => Next::End,
            },
            _ = tx.closed() => Next::Cancelled,
        }
    })
}

fn run_rewriter<R: ChunkRewriter>(
    mut rewriter: R,
    output: &RefCell<Vec<u8>>,
    handle: Handle,
    mut input: BodyDataStream,
    tx: mpsc::Sender<Chunk>,
) {
    // Input the rewriter has consumed but not yet emitted.
    let mut held: Vec<u8> = Vec::new();

    loop {
        match next_chunk(&handle, &mut input, &tx) {
            Next::Chunk(bytes) => {
                if let Err(e) = rewriter.write(&bytes) {
                    tracing::warn!(error = %e, "HTML rewrite failed, forwarding remaining body unmodified");
                    metrics::record_rewrite_fallback();
                    output.borrow_mut().clear();
                    held.extend_from_slice(&bytes);
                    if tx.blocking_send(Ok(Bytes::from(std::mem::take(&mut held)))).is_ok() {
                        passthrough(&handle, &mut input, &tx);
                    }
                    return;
                }

                if output.borrow().is_empty() {
                    held.extend_from_slice(&bytes);
                } else {
                    held.clear();
                    held.extend_from_slice(unfinished_tag(&bytes));
                }
                if !flush(output, &tx) {
                    tracing::debug!("Client went away during HTML rewrite");
                    return;
                }
            }
            Next::Failed(e) => {
                tracing::warn!(error = %e, "Upstream body failed during HTML rewrite");
                let _ = tx.blocking_send(Err(io::Error::other(e)));
                return;
            }
            Next::End => {
                match rewriter.end() {
                    Ok(()) => {
                        flush(output, &tx);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "HTML rewrite failed at end of document, forwarding held input unmodified");
                        metrics::record_rewrite_fallback();
                        output.borrow_mut().clear();
                        if !held.is_empty() {
                            let _ = tx.blocking_send(Ok(Bytes::from(std::mem::take(&mut held))));
                        }
                    }
                }
                return;
            }
            Next::Cancelled => {
                tracing::debug!("Client went away during HTML rewrite");
                return;
            }
        }
    }
}

/// Tail of `chunk` starting at an unclosed `<`. The parser keeps such a
/// tail buffered until the tag completes.
fn unfinished_tag(chunk: &[u8]) -> &[u8] {
    match chunk.iter().rposition(|&b| b == b'<') {
        Some(start) if !chunk[start..].contains(&b'>') => &chunk[start..],
        _ => &[],
    }
}

/// Send whatever the rewriter produced. Returns false once the receiver is gone.
fn flush(output: &RefCell<Vec<u8>>, tx: &mpsc::Sender<Chunk>) -> bool {
    let out = std::mem::take(&mut *output.borrow_mut());
    out.is_empty() || tx.blocking_send(Ok(Bytes::from(out))).is_ok()
}

fn passthrough(handle: &Handle, input: &mut BodyDataStream, tx: &mpsc::Sender<Chunk>) {
    loop {
        let chunk = match next_chunk(handle, input, tx) {
            Next::Chunk(bytes) => Ok(bytes),
            Next::Failed(e) => Err(io::Error::other(e)),
            Next::End | Next::Cancelled => return,
        };
        let failed = chunk.is_err();
        if tx.blocking_send(chunk).is_err() || failed {
            return;
        }
    }
}

fn settings(ctx: &Arc<RewriteContext>) -> Settings<'static, 'static> {
    let href = Arc::clone(ctx);
    let src = Arc::clone(ctx);
    let action = Arc::clone(ctx);
    let srcset = Arc::clone(ctx);
    let og_url = Arc::clone(ctx);
    let og_image = Arc::clone(ctx);
    let twitter_url = Arc::clone(ctx);
    let limit = ctx.max_rewrite_memory();

    Settings {
        element_content_handlers: vec![
            element!("[href]", move |el| {
                // Canonical URLs only change origin; they are never clamped.
                let clamp = !is_canonical(el);
                rewrite_link_attr(el, "href", &href, clamp)
            }),
            element!("[src]", move |el| rewrite_link_attr(el, "src", &src, true)),
            element!("form[action]", move |el| rewrite_link_attr(el, "action", &action, true)),
            element!("[srcset]", move |el| {
                if let Some(value) = el.get_attribute("srcset") {
                    if let Some(new) = srcset.replace_upstream_refs(&value) {
                        el.set_attribute("srcset", &new)?;
                    }
                }
                Ok(())
            }),
            element!(r#"meta[property="og:url"]"#, move |el| {
                rewrite_link_attr(el, "content", &og_url, false)
            }),
            element!(r#"meta[property="og:image"]"#, move |el| {
                rewrite_link_attr(el, "content", &og_image, false)
            }),
            element!(r#"meta[name="twitter:url"]"#, move |el| {
                rewrite_link_attr(el, "content", &twitter_url, false)
            }),
        ],
        memory_settings: MemorySettings {
            preallocated_parsing_buffer_size: PREALLOCATED_BUFFER.min(limit / 2),
            max_allowed_memory_usage: limit,
        },
        strict: false,
        ..Settings::default()
    }
}

fn is_canonical(el: &Element<'_, '_>) -> bool {
    el.tag_name().eq_ignore_ascii_case("link")
        && el
            .get_attribute("rel")
            .is_some_and(|rel| rel.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case("canonical")))
}

fn rewrite_link_attr(el: &mut Element<'_, '_>, attr: &str, ctx: &RewriteContext, clamp: bool) -> HandlerResult {
    if let Some(value) = el.get_attribute(attr) {
        if let Some(new) = ctx.rewrite_link(&value, clamp) {
            el.set_attribute(attr, &new)?;
        }
    }
    Ok(())
}
