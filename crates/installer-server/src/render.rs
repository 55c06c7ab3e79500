//! Install script and plain-text rendering of a [`ResolvedRelease`].
//!
//! Every value that comes from the request is single-quoted for the target
//! shell before it is written into a script.

use std::fmt::Write as _;

use installer_schema::{ArchiveType, Asset, ResolvedRelease};
use thiserror::Error;

/// Rendering failed; surfaces as a 500.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Writing into the output buffer failed.
    #[error("Template error: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Output format of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// POSIX `sh` installer.
    Shell,
    /// PowerShell installer.
    PowerShell,
    /// Human-readable summary.
    Text,
}

impl ScriptKind {
    /// Pick the output for a `type` value (`script` or `text`) and target platform.
    pub fn select(requested: &str, platform: &str) -> Option<Self> {
        match requested {
            "script" if platform == "windows" => Some(Self::PowerShell),
            "script" => Some(Self::Shell),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    /// `Content-Type` header value.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Shell => "text/x-shellscript",
            Self::PowerShell => "text/x-powershell",
            Self::Text => "text/plain",
        }
    }

    /// File extension, used in logs.
    pub fn ext(self) -> &'static str {
        match self {
            Self::Shell => "sh",
            Self::PowerShell => "ps1",
            Self::Text => "txt",
        }
    }

    /// Whether the output is meant to be piped into a shell.
    pub fn is_script(self) -> bool {
        !matches!(self, Self::Text)
    }

    /// Render `release` in this format.
    ///
    /// # Errors
    ///
    /// [`RenderError::Format`] if writing the output fails.
    pub fn render(self, release: &ResolvedRelease) -> Result<String, RenderError> {
        match self {
            Self::Shell => shell(release),
            Self::PowerShell => powershell(release),
            Self::Text => text(release),
        }
    }
}

fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

const SHELL_BODY: &str = r#"
fail() {
	[ -n "$TMP_DIR" ] && rm -rf "$TMP_DIR"
	echo "============"
	echo "Error: $1" 1>&2
	exit 1
}

case "$(uname -s)" in
	Darwin) OS="darwin" ;;
	Linux) OS="linux" ;;
	FreeBSD) OS="freebsd" ;;
	OpenBSD) OS="openbsd" ;;
	*) fail "unknown os: $(uname -s)" ;;
esac
case "$(uname -m)" in
	x86_64|amd64) ARCH="amd64" ;;
	aarch64|arm64) ARCH="arm64" ;;
	i386|i686) ARCH="386" ;;
	arm*) ARCH="arm" ;;
	*) fail "unknown arch: $(uname -m)" ;;
esac
# Apple silicon runs amd64 builds under Rosetta
if [ "$OS" = "darwin" ] && [ "$ARCH" = "arm64" ] && [ "$M1_ASSET" = "false" ]; then
	ARCH="amd64"
fi
"#;

const SHELL_INSTALL: &str = r#"
if [ "$MOVE" = "true" ]; then
	OUT_DIR="/usr/local/bin"
else
	OUT_DIR="$(pwd)"
fi
DEST="$OUT_DIR/$ASPROG"
echo "Installing $OWNER/$PROG $RELEASE ($OS/$ARCH)..."

TMP_DIR="$(mktemp -d)" || fail "mktemp failed"
cd "$TMP_DIR" || fail "cd failed"
case "$FTYPE" in
	.bin) get "$URL" > "$PROG" || fail "download failed" ;;
	.gz) get "$URL" | gzip -d - > "$PROG" || fail "gunzip failed" ;;
	.bz2) get "$URL" | bzip2 -d - > "$PROG" || fail "bunzip2 failed" ;;
	.tar.gz|.tgz) get "$URL" | tar zxf - || fail "untar failed" ;;
	.tar.bz|.tar.bz2) get "$URL" | tar jxf - || fail "untar failed" ;;
	.tar.xz) get "$URL" | tar Jxf - || fail "untar failed" ;;
	.zip)
		get "$URL" > tmp.zip || fail "download failed"
		unzip -o -qq tmp.zip || fail "unzip failed"
		rm tmp.zip
		;;
	*) fail "unknown file type: $FTYPE" ;;
esac

# the largest file in the download is the program
BIN="$(find . -type f -exec du -k {} + | sort -n | tail -n 1 | cut -f 2)"
[ -f "$BIN" ] || fail "could not find binary in download"
chmod +x "$BIN" || fail "chmod +x failed"

if [ -w "$OUT_DIR" ]; then
	mv "$BIN" "$DEST" || fail "mv failed"
else
	echo "$OUT_DIR is not writable, using sudo"
	sudo mv "$BIN" "$DEST" || fail "sudo mv failed"
fi
cd / && rm -rf "$TMP_DIR"
echo "Installed at $DEST"
"#;

fn shell(release: &ResolvedRelease) -> Result<String, RenderError> {
    let q = &release.query;
    let mut out = String::from("#!/bin/sh\n");
    writeln!(
        out,
        "# {}/{} {} generated {}",
        q.user,
        q.program,
        release.version,
        release.timestamp.to_rfc3339()
    )?;
    out.push_str("[ \"$DEBUG\" = \"1\" ] && set -x\n\n");

    writeln!(out, "OWNER={}", sh_quote(&q.user))?;
    writeln!(out, "PROG={}", sh_quote(&q.program))?;
    writeln!(out, "ASPROG={}", sh_quote(q.binary_name()))?;
    writeln!(out, "RELEASE={}", sh_quote(&release.version))?;
    writeln!(out, "MOVE=\"{}\"", q.move_to_path)?;
    writeln!(out, "M1_ASSET=\"{}\"", release.m1_asset)?;
    writeln!(out, "TMP_DIR=\"\"")?;
    out.push_str(SHELL_BODY);

    let (mut curl, mut wget) = (String::new(), String::new());
    if q.insecure {
        curl.push_str(" --insecure");
        wget.push_str(" --no-check-certificate");
    }
    if q.private && !q.token.is_empty() {
        let auth = sh_quote(&format!("Authorization: Bearer {}", q.token));
        let accept = sh_quote("Accept: application/octet-stream");
        write!(curl, " -H {auth} -H {accept}")?;
        write!(wget, " --header={auth} --header={accept}")?;
    }
    out.push_str("\nget() {\n");
    out.push_str("\tif command -v curl >/dev/null 2>&1; then\n");
    writeln!(out, "\t\tcurl --fail --silent --show-error --location{curl} \"$1\"")?;
    out.push_str("\telif command -v wget >/dev/null 2>&1; then\n");
    writeln!(out, "\t\twget -qO-{wget} \"$1\"")?;
    out.push_str("\telse\n\t\tfail \"neither wget nor curl are installed\"\n\tfi\n}\n\n");

    out.push_str("case \"${OS}_${ARCH}\" in\n");
    for asset in &release.assets {
        write_shell_case(&mut out, asset)?;
    }
    out.push_str("\t*) fail \"no asset for platform ${OS}/${ARCH}\" ;;\nesac\n");

    out.push_str(SHELL_INSTALL);
    Ok(out)
}

fn write_shell_case(out: &mut String, asset: &Asset) -> std::fmt::Result {
    writeln!(out, "\t\"{}_{}\")", asset.os, asset.arch)?;
    writeln!(out, "\t\tURL={}", sh_quote(&asset.url))?;
    writeln!(out, "\t\tFTYPE=\"{}\"", asset.kind)?;
    out.push_str("\t\t;;\n");
    Ok(())
}

const POWERSHELL_BODY: &str = r#"
if ($IsMacOS) {
	$os = 'darwin'
} elseif ($IsLinux) {
	$os = 'linux'
} else {
	throw "no windows build of $user/$prog, try again under WSL"
}
switch ([System.Runtime.InteropServices.RuntimeInformation]::OSArchitecture.ToString()) {
	'X64' { $arch = 'amd64' }
	'Arm64' { $arch = 'arm64' }
	'X86' { $arch = '386' }
	'Arm' { $arch = 'arm' }
	default { throw "unknown arch: $_" }
}
if ($os -eq 'darwin' -and $arch -eq 'arm64' -and -not $m1Asset) {
	$arch = 'amd64'
}
$asset = $assets["$os/$arch"]
if (-not $asset) {
	throw "no asset for platform $os/$arch"
}
$url, $ftype = $asset

$outDir = if ($move) { '/usr/local/bin' } else { (Get-Location).Path }
$tmp = Join-Path ([System.IO.Path]::GetTempPath()) ([System.Guid]::NewGuid().ToString())
New-Item -ItemType Directory -Path $tmp | Out-Null
Write-Host "Installing $user/$prog $release ($os/$arch)..."
try {
	$download = Join-Path $tmp "download$ftype"
	Invoke-WebRequest -Uri $url -OutFile $download @request
	switch ($ftype) {
		'.bin' { Move-Item $download (Join-Path $tmp $prog) }
		'.zip' { Expand-Archive -Path $download -DestinationPath $tmp; Remove-Item $download }
		'.gz' { & gzip -d -c $download > (Join-Path $tmp $prog); Remove-Item $download }
		'.bz2' { & bzip2 -d -c $download > (Join-Path $tmp $prog); Remove-Item $download }
		default { & tar -xf $download -C $tmp; Remove-Item $download }
	}
	$bin = Get-ChildItem -Path $tmp -File -Recurse | Sort-Object Length -Descending | Select-Object -First 1
	if (-not $bin) {
		throw 'could not find binary in download'
	}
	& chmod +x $bin.FullName
	$dest = Join-Path $outDir $asProg
	if ($move) {
		& sudo mv $bin.FullName $dest
	} else {
		Move-Item -Force $bin.FullName $dest
	}
	Write-Host "Installed at $dest"
} finally {
	Remove-Item -Recurse -Force $tmp -ErrorAction SilentlyContinue
}
"#;

fn powershell(release: &ResolvedRelease) -> Result<String, RenderError> {
    let q = &release.query;
    let mut out = String::new();
    writeln!(
        out,
        "# {}/{} {} generated {}",
        q.user,
        q.program,
        release.version,
        release.timestamp.to_rfc3339()
    )?;
    out.push_str("$ErrorActionPreference = 'Stop'\n\n");

    writeln!(out, "$user = {}", ps_quote(&q.user))?;
    writeln!(out, "$prog = {}", ps_quote(&q.program))?;
    writeln!(out, "$asProg = {}", ps_quote(q.binary_name()))?;
    writeln!(out, "$release = {}", ps_quote(&release.version))?;
    writeln!(out, "$move = ${}", q.move_to_path)?;
    writeln!(out, "$m1Asset = ${}", release.m1_asset)?;

    out.push_str("$request = @{}\n");
    if q.insecure {
        out.push_str("$request['SkipCertificateCheck'] = $true\n");
    }
    if q.private && !q.token.is_empty() {
        writeln!(
            out,
            "$request['Headers'] = @{{ Authorization = {}; Accept = 'application/octet-stream' }}",
            ps_quote(&format!("Bearer {}", q.token))
        )?;
    }

    out.push_str("$assets = @{\n");
    for asset in &release.assets {
        writeln!(
            out,
            "\t'{}/{}' = @({}, '{}')",
            asset.os,
            asset.arch,
            ps_quote(&asset.url),
            asset.kind
        )?;
    }
    out.push_str("}\n");
    out.push_str(POWERSHELL_BODY);
    Ok(out)
}

fn text(release: &ResolvedRelease) -> Result<String, RenderError> {
    let q = &release.query;
    let mut out = String::new();
    writeln!(out, "provider: {}", q.provider_url)?;
    writeln!(out, "user: {}", q.user)?;
    writeln!(out, "program: {}", q.program)?;
    if !q.as_program.is_empty() {
        writeln!(out, "as: {}", q.as_program)?;
    }
    writeln!(out, "release: {}", release.version)?;
    writeln!(out, "move-into-path: {}", q.move_to_path)?;
    writeln!(out, "private: {}", q.private)?;
    writeln!(out, "resolved-at: {}", release.timestamp.to_rfc3339())?;

    out.push_str("\nrelease assets:\n");
    for asset in &release.assets {
        writeln!(out, "  {}", asset.display_key())?;
        writeln!(out, "    name:   {}", asset.name)?;
        writeln!(out, "    type:   {}", asset.kind)?;
        if asset.kind == ArchiveType::Bin || asset.size > 0 {
            writeln!(out, "    size:   {}", asset.size)?;
        }
        writeln!(out, "    url:    {}", asset.url)?;
    }
    writeln!(out, "has-m1-asset: {}", release.m1_asset)?;
    out.push_str("\nto see shell script, append ?type=script\n");
    Ok(out)
}
