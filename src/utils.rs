use bytes::BytesMut;

pub(crate) trait BufferWriter {
    fn write_to_buffer(&self, buffer: &mut BytesMut);
}

/// Joins items with `separator`, writing each through [`BufferWriter`].
pub(crate) fn write_joined<'a, T, I>(buffer: &mut BytesMut, items: I, separator: &[u8])
where
    T: BufferWriter + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut first = true;
    for item in items {
        if !first {
            buffer.extend_from_slice(separator);
        }
        item.write_to_buffer(buffer);
        first = false;
    }
}

/// Checks that `host` is a bare `host[:port]` authority with nothing that
/// could carry extra policy syntax.
pub(crate) fn is_valid_authority(host: &str) -> bool {
    if host.is_empty()
        || host.bytes().any(|b| {
            b.is_ascii_whitespace() || b.is_ascii_control() || b"/\\?#@;,'\"*".contains(&b)
        })
    {
        return false;
    }

    match url::Url::parse(&format!("http://{}", host)) {
        Ok(url) => {
            url.host_str().is_some()
                && url.username().is_empty()
                && url.password().is_none()
                && url.path() == "/"
        }
        Err(_) => false,
    }
}
