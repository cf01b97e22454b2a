//! Decoding of named buffers into typed numeric views.
//!
//! A buffer arrives either already typed (library callers), as raw little
//! endian bytes, or as base64 text (widget transport). [`resolve`] turns any of
//! these into a [`TypedView`] according to the element type declared in the
//! scene's [`BufferSpec`].

use crate::core::{BufferSpec, Dtype, WireBuffer, WirePayload};
use crate::{Result, SceneError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use error_stack::{Report, ResultExt};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// Flat numeric array of one of the eight supported element types.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedView {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I8(Vec<i8>),
    U8(Vec<u8>),
}

macro_rules! for_each_view {
    ($view:expr, $v:ident => $body:expr) => {
        match $view {
            TypedView::F32($v) => $body,
            TypedView::F64($v) => $body,
            TypedView::I32($v) => $body,
            TypedView::U32($v) => $body,
            TypedView::I16($v) => $body,
            TypedView::U16($v) => $body,
            TypedView::I8($v) => $body,
            TypedView::U8($v) => $body,
        }
    };
}

impl TypedView {
    pub fn len(&self) -> usize {
        for_each_view!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            TypedView::F32(_) => Dtype::Float32,
            TypedView::F64(_) => Dtype::Float64,
            TypedView::I32(_) => Dtype::Int32,
            TypedView::U32(_) => Dtype::Uint32,
            TypedView::I16(_) => Dtype::Int16,
            TypedView::U16(_) => Dtype::Uint16,
            TypedView::I8(_) => Dtype::Int8,
            TypedView::U8(_) => Dtype::Uint8,
        }
    }

    /// Interpret `bytes` as a packed array of `dtype` elements.
    pub fn from_bytes(dtype: &Dtype, bytes: &[u8]) -> std::result::Result<Self, SceneError> {
        let size = dtype
            .element_size()
            .ok_or_else(|| SceneError::UnsupportedDtype(dtype.name().to_string()))?;
        if bytes.len() % size != 0 {
            return Err(SceneError::InvalidByteLength {
                name: String::new(),
                dtype: dtype.name().to_string(),
                len: bytes.len(),
            });
        }
        // pod_collect_to_vec copies into a freshly aligned allocation, so the
        // source slice may start at any offset.
        match dtype {
            Dtype::Float32 => Ok(TypedView::F32(bytemuck::pod_collect_to_vec(bytes))),
            Dtype::Float64 => Ok(TypedView::F64(bytemuck::pod_collect_to_vec(bytes))),
            Dtype::Int32 => Ok(TypedView::I32(bytemuck::pod_collect_to_vec(bytes))),
            Dtype::Uint32 => Ok(TypedView::U32(bytemuck::pod_collect_to_vec(bytes))),
            Dtype::Int16 => Ok(TypedView::I16(bytemuck::pod_collect_to_vec(bytes))),
            Dtype::Uint16 => Ok(TypedView::U16(bytemuck::pod_collect_to_vec(bytes))),
            Dtype::Int8 => Ok(TypedView::I8(bytemuck::pod_collect_to_vec(bytes))),
            Dtype::Uint8 => Ok(TypedView::U8(bytes.to_vec())),
            Dtype::Unsupported(name) => Err(SceneError::UnsupportedDtype(name.clone())),
        }
    }

    /// Widen or narrow every element to `f32`.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            TypedView::F32(v) => v.clone(),
            TypedView::F64(v) => v.iter().map(|&x| x as f32).collect(),
            TypedView::I32(v) => v.iter().map(|&x| x as f32).collect(),
            TypedView::U32(v) => v.iter().map(|&x| x as f32).collect(),
            TypedView::I16(v) => v.iter().map(|&x| f32::from(x)).collect(),
            TypedView::U16(v) => v.iter().map(|&x| f32::from(x)).collect(),
            TypedView::I8(v) => v.iter().map(|&x| f32::from(x)).collect(),
            TypedView::U8(v) => v.iter().map(|&x| f32::from(x)).collect(),
        }
    }

    /// Borrow as `f32` when already float32, convert otherwise.
    pub fn to_f32_cow(&self) -> Cow<'_, [f32]> {
        match self {
            TypedView::F32(v) => Cow::Borrowed(v.as_slice()),
            other => Cow::Owned(other.to_f32_vec()),
        }
    }

    /// Overwrite `dst` element by element. Extra elements on either side are
    /// ignored; callers check lengths first.
    pub fn write_f32(&self, dst: &mut [f32]) {
        for_each_view!(self, v => {
            for (d, &x) in dst.iter_mut().zip(v.iter()) {
                *d = x as f32;
            }
        })
    }

    /// Element `i` as `f32`, without converting the whole view.
    pub fn get_f32(&self, i: usize) -> Option<f32> {
        for_each_view!(self, v => v.get(i).map(|&x| x as f32))
    }

    /// Index list for triangle faces. Only integer views qualify and negative
    /// entries are rejected.
    pub fn to_u32_indices(&self) -> Option<Vec<u32>> {
        match self {
            TypedView::U32(v) => Some(v.clone()),
            TypedView::U16(v) => Some(v.iter().map(|&x| u32::from(x)).collect()),
            TypedView::U8(v) => Some(v.iter().map(|&x| u32::from(x)).collect()),
            TypedView::I32(v) => v.iter().map(|&x| u32::try_from(x).ok()).collect(),
            TypedView::I16(v) => v.iter().map(|&x| u32::try_from(x).ok()).collect(),
            TypedView::I8(v) => v.iter().map(|&x| u32::try_from(x).ok()).collect(),
            TypedView::F32(_) | TypedView::F64(_) => None,
        }
    }
}

impl From<Vec<f32>> for TypedView {
    fn from(v: Vec<f32>) -> Self {
        TypedView::F32(v)
    }
}

impl From<Vec<f64>> for TypedView {
    fn from(v: Vec<f64>) -> Self {
        TypedView::F64(v)
    }
}

impl From<Vec<u32>> for TypedView {
    fn from(v: Vec<u32>) -> Self {
        TypedView::U32(v)
    }
}

/// A stored buffer before resolution.
#[derive(Clone, Debug, PartialEq)]
pub enum BufferSource {
    Typed(TypedView),
    Bytes(Vec<u8>),
    Base64(String),
}

impl From<TypedView> for BufferSource {
    fn from(v: TypedView) -> Self {
        BufferSource::Typed(v)
    }
}

/// Buffer key to stored buffer, valid for one scene version.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BufferMap(HashMap<String, BufferSource>);

impl BufferMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, source: impl Into<BufferSource>) {
        self.0.insert(key.into(), source.into());
    }

    pub fn with(mut self, key: impl Into<String>, source: impl Into<BufferSource>) -> Self {
        self.insert(key, source);
        self
    }

    pub fn get(&self, key: &str) -> Option<&BufferSource> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One animation frame: a sparse set of decoded buffer replacements.
pub type FrameBuffers = HashMap<String, TypedView>;

/// Resolve `name` from `buffers` into a typed view.
///
/// Typed sources are returned borrowed; byte and base64 sources are decoded
/// with `spec.dtype`. `spec.shape` is not validated.
pub fn resolve<'a>(
    name: &str,
    spec: &BufferSpec,
    buffers: &'a BufferMap,
) -> Result<Cow<'a, TypedView>> {
    let Some(raw) = buffers.get(name) else {
        return Err(Report::new(SceneError::MissingBuffer(name.to_string())));
    };
    match raw {
        BufferSource::Typed(view) => Ok(Cow::Borrowed(view)),
        BufferSource::Bytes(bytes) => decode_named(name, &spec.dtype, bytes).map(Cow::Owned),
        BufferSource::Base64(text) => {
            let bytes = decode_base64(name, text)?;
            decode_named(name, &spec.dtype, &bytes).map(Cow::Owned)
        }
    }
}

fn decode_base64(name: &str, text: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(text.trim())
        .map_err(|e| Report::new(SceneError::InvalidPayload(e.to_string())))
        .attach(format!("decoding base64 buffer {name}"))
}

fn decode_named(name: &str, dtype: &Dtype, bytes: &[u8]) -> Result<TypedView> {
    TypedView::from_bytes(dtype, bytes).map_err(|err| {
        let err = match err {
            SceneError::InvalidByteLength { dtype, len, .. } => SceneError::InvalidByteLength {
                name: name.to_string(),
                dtype,
                len,
            },
            other => other,
        };
        Report::new(err).attach(format!("buffer {name}"))
    })
}

/// Decode one wire entry `{dtype, data: base64}` into a typed view.
pub fn decode_wire_buffer(key: &str, entry: &WireBuffer) -> Result<TypedView> {
    if entry.dtype.element_size().is_none() {
        return Err(Report::new(SceneError::UnsupportedDtype(
            entry.dtype.name().to_string(),
        )))
        .attach(format!("buffer {key}"));
    }
    let bytes = decode_base64(key, &entry.data)?;
    decode_named(key, &entry.dtype, &bytes)
}

/// Decode a whole key to `{dtype, data}` mapping into a [`BufferMap`] of typed views.
pub fn decode_wire_buffers(entries: &BTreeMap<String, WireBuffer>) -> Result<BufferMap> {
    let mut map = BufferMap::new();
    for (key, entry) in entries {
        map.insert(key.clone(), decode_wire_buffer(key, entry)?);
    }
    Ok(map)
}

pub fn decode_frames(frames: &[BTreeMap<String, WireBuffer>]) -> Result<Vec<FrameBuffers>> {
    frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            frame
                .iter()
                .map(|(key, entry)| Ok((key.clone(), decode_wire_buffer(key, entry)?)))
                .collect::<Result<FrameBuffers>>()
                .attach(format!("frame {i}"))
        })
        .collect()
}

/// A fully decoded widget payload.
#[derive(Clone, Debug)]
pub struct DecodedPayload {
    pub scene: crate::core::SceneSpec,
    pub buffers: BufferMap,
    pub frames: Vec<FrameBuffers>,
}

impl DecodedPayload {
    pub fn from_wire(payload: &WirePayload) -> Result<Self> {
        Ok(Self {
            scene: payload.scene.clone(),
            buffers: decode_wire_buffers(&payload.buffers)?,
            frames: decode_frames(&payload.frames)?,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let payload: WirePayload = serde_json::from_str(json)
            .map_err(|e| Report::new(SceneError::InvalidPayload(e.to_string())))?;
        Self::from_wire(&payload)
    }
}

/// Encode a typed view as base64 of its little endian bytes.
pub fn encode_base64(view: &TypedView) -> String {
    let bytes: &[u8] = for_each_view!(view, v => bytemuck::cast_slice(v.as_slice()));
    BASE64.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(dtype: Dtype) -> BufferSpec {
        BufferSpec::new(dtype, vec![])
    }

    #[test]
    fn typed_source_is_returned_borrowed() {
        let map = BufferMap::new().with("p", TypedView::F32(vec![0.0, 1.0, 2.0]));
        let view = resolve("p", &spec(Dtype::Float32), &map).unwrap();
        assert!(matches!(view, Cow::Borrowed(_)));
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn typed_source_ignores_declared_dtype() {
        let map = BufferMap::new().with("v", TypedView::U8(vec![1, 2]));
        let view = resolve("v", &spec(Dtype::Float64), &map).unwrap();
        assert_eq!(view.dtype(), Dtype::Uint8);
    }

    #[test]
    fn raw_bytes_use_declared_dtype() {
        let bytes: Vec<u8> = [1u16, 2, 65535]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let map = BufferMap::new().with("idx", BufferSource::Bytes(bytes));
        let view = resolve("idx", &spec(Dtype::Uint16), &map).unwrap();
        assert_eq!(view.into_owned(), TypedView::U16(vec![1, 2, 65535]));
    }

    #[test]
    fn base64_float32_round_trips_exactly() {
        let source = vec![0.0f32, -1.5, 3.25, f32::MIN_POSITIVE, 1.0e30, 0.1];
        let encoded = encode_base64(&TypedView::F32(source.clone()));
        let map = BufferMap::new().with("p", BufferSource::Base64(encoded));
        let view = resolve("p", &spec(Dtype::Float32), &map).unwrap();
        let TypedView::F32(values) = view.into_owned() else {
            panic!("expected float32 view");
        };
        assert_eq!(values.len(), source.len());
        for (a, b) in values.iter().zip(&source) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn missing_buffer_is_reported() {
        let err = resolve("nope", &spec(Dtype::Float32), &BufferMap::new()).unwrap_err();
        assert_eq!(
            err.current_context(),
            &SceneError::MissingBuffer("nope".into())
        );
    }

    #[test]
    fn unsupported_dtype_is_reported() {
        let map = BufferMap::new().with("p", BufferSource::Bytes(vec![0; 8]));
        let err = resolve("p", &spec(Dtype::Unsupported("complex64".into())), &map).unwrap_err();
        assert_eq!(
            err.current_context(),
            &SceneError::UnsupportedDtype("complex64".into())
        );
    }

    #[test]
    fn truncated_bytes_are_rejected() {
        let map = BufferMap::new().with("p", BufferSource::Bytes(vec![0; 6]));
        let err = resolve("p", &spec(Dtype::Float32), &map).unwrap_err();
        assert!(matches!(
            err.current_context(),
            SceneError::InvalidByteLength { name, len: 6, .. } if name == "p"
        ));
    }

    #[test]
    fn index_conversion_rejects_floats_and_negatives() {
        assert_eq!(
            TypedView::I32(vec![0, 1, 2]).to_u32_indices(),
            Some(vec![0, 1, 2])
        );
        assert_eq!(TypedView::I32(vec![0, -1]).to_u32_indices(), None);
        assert_eq!(TypedView::F32(vec![0.0]).to_u32_indices(), None);
    }

    #[test]
    fn wire_payload_decodes_buffers_and_frames() {
        let p = encode_base64(&TypedView::F32(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]));
        let json = format!(
            r#"{{
                "scene": {{"objects": [], "buffers": {{}}}},
                "buffers": {{"p": {{"dtype": "float32", "shape": [2, 3], "data": "{p}"}}}},
                "frames": [{{"p": {{"dtype": "float32", "data": "{p}"}}}}]
            }}"#
        );
        let decoded = DecodedPayload::from_json(&json).unwrap();
        assert_eq!(decoded.buffers.len(), 1);
        assert_eq!(decoded.frames.len(), 1);
        assert_eq!(decoded.frames[0]["p"].len(), 6);
    }

    #[test]
    fn wire_payload_with_unknown_dtype_fails() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "p".to_string(),
            WireBuffer {
                dtype: Dtype::Unsupported("bool".into()),
                shape: None,
                data: String::new(),
            },
        );
        let err = decode_wire_buffers(&entries).unwrap_err();
        assert_eq!(
            err.current_context(),
            &SceneError::UnsupportedDtype("bool".into())
        );
    }
}
