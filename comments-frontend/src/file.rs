//! Reading files picked by the user.

use js_sys::Promise;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{File, FileReader};

use comments_core::file::{AttachedFile, FileLike, MSG_READ_FAILED};

/// Metadata of a browser file, checked before its content is read.
pub struct PickedFile {
    mime: String,
    size: u64,
}

impl From<&File> for PickedFile {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from(file: &File) -> Self {
        Self {
            mime: file.type_(),
            size: file.size() as u64,
        }
    }
}

impl FileLike for PickedFile {
    fn mime(&self) -> &str {
        &self.mime
    }
    fn size(&self) -> u64 {
        self.size
    }
}

/// Reads the file as data URL and converts it into an attachment.
pub async fn read_attachment(file: &File) -> Result<AttachedFile, String> {
    let data_url = read_as_data_url(file).await.map_err(|err| {
        log::warn!("Unable to read {}: {err:?}", file.name());
        MSG_READ_FAILED.to_string()
    })?;
    AttachedFile::from_data_url(file.name(), data_url).map_err(|err| err.to_string())
}

async fn read_as_data_url(file: &File) -> Result<String, JsValue> {
    let reader = FileReader::new()?;
    let promise = Promise::new(&mut |resolve, reject| {
        let onload = {
            let reader = reader.clone();
            Closure::once_into_js(move || {
                let result = reader.result().unwrap_or(JsValue::NULL);
                _ = resolve.call1(&JsValue::NULL, &result);
            })
        };
        let onerror = Closure::once_into_js(move || {
            _ = reject.call1(&JsValue::NULL, &JsValue::from_str(MSG_READ_FAILED));
        });
        reader.set_onload(Some(onload.unchecked_ref()));
        reader.set_onerror(Some(onerror.unchecked_ref()));
    });
    reader.read_as_data_url(file)?;
    JsFuture::from(promise)
        .await?
        .as_string()
        .ok_or_else(|| JsValue::from_str(MSG_READ_FAILED))
}
