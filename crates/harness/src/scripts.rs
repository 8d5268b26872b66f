//! In-page scripts used by the audit checks
//!
//! Each script is a function expression. Page scripts take `(arg)`, element
//! scripts take `(el, arg)`. They only collect raw facts; verdicts are made
//! on the Rust side.

/// Hyphenated (custom) elements with their attribute names, crossing shadow roots.
///
/// Returns `[{ tag, attributes: [name, ...] }, ...]`, one entry per element.
pub const CUSTOM_ELEMENT_CENSUS: &str = r#"() => {
  const found = [];
  const scan = (node) => {
    if (node.tagName && node.tagName.includes('-')) {
      found.push({
        tag: node.tagName.toLowerCase(),
        attributes: Array.from(node.attributes || []).map((a) => a.name.toLowerCase()),
      });
    }
    if (node.shadowRoot) node.shadowRoot.childNodes.forEach(scan);
    node.childNodes.forEach(scan);
  };
  scan(document.body);
  return found;
}"#;

/// Distinct computed `display` values of every element
pub const DISPLAY_MODES: &str = r#"() => {
  const modes = new Set();
  document.querySelectorAll('*').forEach((el) => modes.add(window.getComputedStyle(el).display));
  return Array.from(modes);
}"#;

/// Declared HTML5 constraints of a form control
pub const DECLARED_CONSTRAINTS: &str = r#"(el) => ({
  required: el.hasAttribute('required'),
  minlength: el.hasAttribute('minlength'),
})"#;

/// Native validity state of a form control
pub const VALIDITY_STATE: &str = r#"(el) => ({
  valid: el.validity ? el.validity.valid : true,
  message: el.validationMessage || '',
})"#;

/// Document scroll width against the viewport width
pub const HORIZONTAL_OVERFLOW: &str = r#"() => ({
  scrollWidth: document.documentElement.scrollWidth,
  innerWidth: window.innerWidth,
})"#;

/// Lower-cased body markup plus a dedicated loading element check
pub const PAGE_MARKUP: &str = r#"() => ({
  markup: document.body ? document.body.innerHTML.toLowerCase() : '',
  loadingElement: document.querySelector('loading-indicator') !== null,
})"#;

/// Click overlay buttons described by an overlay sweep, returns the click count
pub const SWEEP_OVERLAYS: &str = r#"(arg) => {
  let clicked = 0;
  document.querySelectorAll(arg.candidates).forEach((el) => {
    const text = (el.textContent || '').toLowerCase().trim();
    if (el.matches(arg.always) || arg.texts.includes(text)) {
      if (typeof el.click === 'function') {
        el.click();
        clicked += 1;
      }
    }
  });
  return clicked;
}"#;
