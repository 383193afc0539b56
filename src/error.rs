use std::{error, ffi, fmt, io};

#[derive(Debug)]
pub enum ShellError {
	NixError(nix::Error),
	IoError(io::Error),
	NulError(ffi::NulError),
	Usage(&'static str),
	TooManyTokens,
}

impl From<nix::Error> for ShellError {
	fn from(e: nix::Error) -> ShellError {
		ShellError::NixError(e)
	}
}
impl From<io::Error> for ShellError {
	fn from(e: io::Error) -> ShellError {
		ShellError::IoError(e)
	}
}
impl From<ffi::NulError> for ShellError {
	fn from(e: ffi::NulError) -> ShellError {
		ShellError::NulError(e)
	}
}

impl fmt::Display for ShellError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			ShellError::NixError(ref e) => write!(f, "{}", e.desc()),
			ShellError::IoError(ref e) => match e.raw_os_error() {
				Some(code) => write!(f, "{}", nix::errno::Errno::from_raw(code).desc()),
				None => write!(f, "{}", e),
			},
			ShellError::NulError(ref e) => write!(f, "argument contains a nul byte: {}", e),
			ShellError::Usage(usage) => write!(f, "usage: {}", usage),
			ShellError::TooManyTokens => write!(f, "too many arguments"),
		}
	}
}

impl error::Error for ShellError {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match *self {
			ShellError::NixError(ref e) => Some(e),
			ShellError::IoError(ref e) => Some(e),
			ShellError::NulError(ref e) => Some(e),
			ShellError::Usage(_) | ShellError::TooManyTokens => None,
		}
	}
}

impl ShellError {
	/// The value stored as the last exit status when this error ends a command.
	pub fn code(&self) -> i32 {
		match *self {
			ShellError::NixError(e) => e as i32,
			ShellError::IoError(ref e) => e.raw_os_error().unwrap_or(libc::EIO),
			ShellError::NulError(_) | ShellError::Usage(_) => libc::EINVAL,
			ShellError::TooManyTokens => libc::E2BIG,
		}
	}

	pub fn is_not_found(&self) -> bool {
		match *self {
			ShellError::NixError(e) => e == nix::errno::Errno::ENOENT,
			ShellError::IoError(ref e) => e.kind() == io::ErrorKind::NotFound,
			_ => false,
		}
	}
}
