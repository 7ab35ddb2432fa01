#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use crate::Settings;

#[cfg(target_arch = "wasm32")]
fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Split interleaved samples into chunks
///
/// # Arguments
/// * `samples` - Interleaved f32 samples in range [-1.0, 1.0]
/// * `settings_json` - Settings as JSON; missing fields take defaults
///
/// # Returns
/// Array of Uint8Array, one complete Ogg/Opus stream per chunk
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn split_audio(samples: &[f32], settings_json: &str) -> Result<js_sys::Array, JsValue> {
    let settings = Settings::from_json(settings_json).map_err(js_error)?;
    let chunks = crate::split_samples(samples, &settings).map_err(js_error)?;

    let out = js_sys::Array::new();
    for chunk in chunks {
        out.push(&js_sys::Uint8Array::from(&chunk.data[..]).into());
    }
    Ok(out)
}

/// Split a decodable audio file (mp3, wav, flac, ogg, etc.) held in memory.
/// Rate and channel count come from the file.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn split_audio_file(audio_bytes: &[u8], settings_json: &str) -> Result<js_sys::Array, JsValue> {
    let base = Settings::from_json(settings_json).map_err(js_error)?;
    let source = crate::audio::SymphoniaSource::from_bytes(audio_bytes.to_vec()).map_err(js_error)?;
    let settings = Settings::new(
        source.rate(),
        source.channels() as u8,
        base.bitrate(),
        base.overlap(),
        base.length(),
    )
    .map_err(js_error)?;

    let out = js_sys::Array::new();
    crate::split_stream(source, &crate::SplitOptions::new(settings), |chunk| {
        out.push(&js_sys::Uint8Array::from(&chunk.data[..]).into());
        Ok(())
    })
    .map_err(js_error)?;
    Ok(out)
}

/// Chunk boundaries for `duration_secs` of audio, as an array of objects
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn plan_chunks(settings_json: &str, duration_secs: f64) -> Result<JsValue, JsValue> {
    let settings = Settings::from_json(settings_json).map_err(js_error)?;
    let total = (duration_secs.max(0.0) * settings.rate() as f64).round() as u64;
    serde_wasm_bindgen::to_value(&crate::plan(&settings, total)).map_err(js_error)
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn get_chunk_info_json(chunk_bytes: &[u8]) -> Result<String, JsValue> {
    let info = crate::get_chunk_info(chunk_bytes).map_err(js_error)?;
    serde_json::to_string(&info).map_err(js_error)
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn chunk_content_id(chunk_bytes: &[u8]) -> String {
    crate::content_id(chunk_bytes)
}

// Initialize wasm-bindgen panic hook for better error messages
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}
