//! Bus plumbing tests.
