use chromiumoxide::Page;
use folio_engine::backend::RendererError;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Timeout for a single script evaluation. A modal dialog blocks the JS thread.
const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum retries while the execution context is being replaced.
const MAX_CONTEXT_RETRIES: u32 = 10;

const CONTEXT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Check if an error indicates the page context is unavailable (e.g., during navigation).
fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

/// Wrap `body` so it runs against the document of the frame at the end of
/// `frames`, with `doc` and `win` bound. Each index selects among the
/// `<iframe>` elements of the previous document; a cross-origin frame has no
/// readable `contentDocument` and makes the script throw.
pub fn in_frame(frames: &[usize], body: &str) -> String {
    let path = frames
        .iter()
        .map(|index| index.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"(function () {{
  let doc = document;
  for (const index of [{path}]) {{
    const frame = doc.querySelectorAll('iframe')[index];
    if (!frame) throw new Error('iframe ' + (index + 1) + ' is gone');
    const next = frame.contentDocument;
    if (!next) throw new Error('iframe ' + (index + 1) + ' is not accessible');
    doc = next;
  }}
  const win = doc.defaultView;
  {body}
}})()"#
    )
}

/// JS expression for the scroll root of `scope` (`null` container id means the document).
pub fn scope_root(container: Option<&str>) -> String {
    match container {
        None => "(doc.scrollingElement || doc.documentElement)".to_string(),
        Some(id) => {
            let id = serde_json::to_string(id).unwrap_or_else(|_| "\"\"".to_string());
            format!(
                "(function () {{ const el = doc.getElementById({id}); \
                 if (!el) throw new Error('no element #' + {id}); return el; }})()"
            )
        }
    }
}

/// Evaluate `expression` and deserialize its value, retrying while the page
/// is between execution contexts.
pub async fn evaluate<T: DeserializeOwned>(
    page: &Page,
    expression: &str,
) -> Result<T, RendererError> {
    let mut last_error = None;

    for attempt in 0..MAX_CONTEXT_RETRIES {
        match evaluate_with_timeout(page, expression).await {
            Ok(value) => {
                return serde_json::from_value(value).map_err(RendererError::Serialization);
            }
            Err(EvalError::Timeout) => {
                return Err(RendererError::Timeout(
                    "Script timed out - possibly blocked by a dialog".into(),
                ));
            }
            Err(EvalError::Context(err_str)) => {
                tracing::debug!(
                    "Context error during evaluation (attempt {}/{}), retrying...",
                    attempt + 1,
                    MAX_CONTEXT_RETRIES
                );
                last_error = Some(err_str);
                tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
            }
            Err(EvalError::Other(err_str)) => return Err(RendererError::Script(err_str)),
        }
    }

    Err(RendererError::Script(last_error.unwrap_or_else(|| {
        "Failed to evaluate script after retries".to_string()
    })))
}

enum EvalError {
    Timeout,
    Context(String),
    Other(String),
}

async fn evaluate_with_timeout(
    page: &Page,
    expression: &str,
) -> Result<serde_json::Value, EvalError> {
    let eval_result =
        tokio::time::timeout(EVAL_TIMEOUT, page.evaluate_expression(expression)).await;

    match eval_result {
        Err(_) => Err(EvalError::Timeout),
        Ok(Err(e)) => {
            let err_str = e.to_string();
            if is_context_error(&err_str) {
                Err(EvalError::Context(err_str))
            } else {
                Err(EvalError::Other(err_str))
            }
        }
        Ok(Ok(result)) => result
            .into_value::<serde_json::Value>()
            .map_err(|e| EvalError::Other(format!("Failed to get result: {}", e))),
    }
}
