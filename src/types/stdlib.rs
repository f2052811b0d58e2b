//! Declarations of the standard-library packages generated code and
//! typical programs lean on. Each stub is ordinary Go source with bodyless
//! functions, loaded like any other package.

const ERRORS: &str = r#"
package errors

func New(text string) error
func Is(err, target error) bool
func As(err error, target any) bool
func Unwrap(err error) error
func Join(errs ...error) error
"#;

const FMT: &str = r#"
package fmt

import "io"

type Stringer interface {
	String() string
}

type State interface {
	Write(b []byte) (n int, err error)
	Width() (wid int, ok bool)
	Flag(c int) bool
}

func Print(a ...any) (n int, err error)
func Println(a ...any) (n int, err error)
func Printf(format string, a ...any) (n int, err error)
func Fprint(w io.Writer, a ...any) (n int, err error)
func Fprintln(w io.Writer, a ...any) (n int, err error)
func Fprintf(w io.Writer, format string, a ...any) (n int, err error)
func Sprint(a ...any) string
func Sprintln(a ...any) string
func Sprintf(format string, a ...any) string
func Errorf(format string, a ...any) error
func Sscan(str string, a ...any) (n int, err error)
func Sscanf(str string, format string, a ...any) (n int, err error)
func Scanln(a ...any) (n int, err error)
"#;

const IO: &str = r#"
package io

type Reader interface {
	Read(p []byte) (n int, err error)
}

type Writer interface {
	Write(p []byte) (n int, err error)
}

type Closer interface {
	Close() error
}

type ReadCloser interface {
	Reader
	Closer
}

type WriteCloser interface {
	Writer
	Closer
}

type ReadWriter interface {
	Reader
	Writer
}

type StringWriter interface {
	WriteString(s string) (n int, err error)
}

var EOF error
var Discard Writer

func Copy(dst Writer, src Reader) (written int64, err error)
func ReadAll(r Reader) ([]byte, error)
func WriteString(w Writer, s string) (n int, err error)
"#;

const OS: &str = r#"
package os

import "time"

type FileMode uint32

type FileInfo interface {
	Name() string
	Size() int64
	Mode() FileMode
	ModTime() time.Time
	IsDir() bool
}

type File struct {
	name string
}

func (f *File) Close() error
func (f *File) Name() string
func (f *File) Read(b []byte) (n int, err error)
func (f *File) Write(b []byte) (n int, err error)
func (f *File) WriteString(s string) (n int, err error)
func (f *File) Sync() error
func (f *File) Stat() (FileInfo, error)

var Args []string
var Stdin *File
var Stdout *File
var Stderr *File
var ErrNotExist error

func Open(name string) (*File, error)
func Create(name string) (*File, error)
func OpenFile(name string, flag int, perm FileMode) (*File, error)
func ReadFile(name string) ([]byte, error)
func WriteFile(name string, data []byte, perm FileMode) error
func Remove(name string) error
func RemoveAll(path string) error
func Rename(oldpath, newpath string) error
func Mkdir(name string, perm FileMode) error
func MkdirAll(path string, perm FileMode) error
func MkdirTemp(dir, pattern string) (string, error)
func Stat(name string) (FileInfo, error)
func Getenv(key string) string
func LookupEnv(key string) (string, bool)
func Setenv(key, value string) error
func Unsetenv(key string) error
func Getwd() (dir string, err error)
func Chdir(dir string) error
func Exit(code int)
func IsNotExist(err error) bool
func IsExist(err error) bool
"#;

const LOG: &str = r#"
package log

import "io"

type Logger struct {
	prefix string
}

func New(out io.Writer, prefix string, flag int) *Logger
func (l *Logger) Print(v ...any)
func (l *Logger) Printf(format string, v ...any)
func (l *Logger) Println(v ...any)
func (l *Logger) Fatal(v ...any)
func (l *Logger) Fatalf(format string, v ...any)

func Print(v ...any)
func Printf(format string, v ...any)
func Println(v ...any)
func Fatal(v ...any)
func Fatalf(format string, v ...any)
func Fatalln(v ...any)
func Panic(v ...any)
func Panicf(format string, v ...any)
func SetFlags(flag int)
func SetPrefix(prefix string)
func SetOutput(w io.Writer)
"#;

const TESTING: &str = r#"
package testing

type TB interface {
	Error(args ...any)
	Errorf(format string, args ...any)
	Fatal(args ...any)
	Fatalf(format string, args ...any)
	Helper()
}

type T struct {
	name string
}

func (t *T) Error(args ...any)
func (t *T) Errorf(format string, args ...any)
func (t *T) Fatal(args ...any)
func (t *T) Fatalf(format string, args ...any)
func (t *T) Log(args ...any)
func (t *T) Logf(format string, args ...any)
func (t *T) Helper()
func (t *T) Skip(args ...any)
func (t *T) Cleanup(f func())
func (t *T) TempDir() string
func (t *T) Parallel()
func (t *T) Run(name string, f func(t *T)) bool

type B struct {
	N int
}

func (b *B) Error(args ...any)
func (b *B) Errorf(format string, args ...any)
func (b *B) Fatal(args ...any)
func (b *B) Fatalf(format string, args ...any)
func (b *B) Helper()
func (b *B) ResetTimer()
func (b *B) Run(name string, f func(b *B)) bool

type F struct {
	name string
}

func (f *F) Add(args ...any)
func (f *F) Fuzz(ff any)
func (f *F) Fatal(args ...any)
func (f *F) Helper()

type M struct {
	name string
}

func (m *M) Run() int

func Short() bool
"#;

const STRINGS: &str = r#"
package strings

type Builder struct {
	buf []byte
}

func (b *Builder) String() string
func (b *Builder) Len() int
func (b *Builder) Reset()
func (b *Builder) Grow(n int)
func (b *Builder) Write(p []byte) (int, error)
func (b *Builder) WriteByte(c byte) error
func (b *Builder) WriteRune(r rune) (int, error)
func (b *Builder) WriteString(s string) (int, error)

type Reader struct {
	s string
}

func (r *Reader) Read(b []byte) (n int, err error)
func (r *Reader) Len() int

func NewReader(s string) *Reader
func Contains(s, substr string) bool
func ContainsRune(s string, r rune) bool
func HasPrefix(s, prefix string) bool
func HasSuffix(s, suffix string) bool
func Index(s, substr string) int
func Split(s, sep string) []string
func SplitN(s, sep string, n int) []string
func Join(elems []string, sep string) string
func Fields(s string) []string
func TrimSpace(s string) string
func Trim(s, cutset string) string
func TrimPrefix(s, prefix string) string
func TrimSuffix(s, suffix string) string
func ToUpper(s string) string
func ToLower(s string) string
func Repeat(s string, count int) string
func Replace(s, old, new string, n int) string
func ReplaceAll(s, old, new string) string
func EqualFold(s, t string) bool
func Cut(s, sep string) (before, after string, found bool)
"#;

const STRCONV: &str = r#"
package strconv

type NumError struct {
	Func string
	Num  string
	Err  error
}

func (e *NumError) Error() string

func Atoi(s string) (int, error)
func Itoa(i int) string
func ParseInt(s string, base int, bitSize int) (int64, error)
func ParseUint(s string, base int, bitSize int) (uint64, error)
func ParseFloat(s string, bitSize int) (float64, error)
func ParseBool(str string) (bool, error)
func FormatInt(i int64, base int) string
func FormatFloat(f float64, fmt byte, prec, bitSize int) string
func FormatBool(b bool) string
func Quote(s string) string
func Unquote(s string) (string, error)
"#;

const BYTES: &str = r#"
package bytes

import "io"

type Buffer struct {
	buf []byte
}

func NewBuffer(buf []byte) *Buffer
func NewBufferString(s string) *Buffer
func (b *Buffer) Bytes() []byte
func (b *Buffer) String() string
func (b *Buffer) Len() int
func (b *Buffer) Reset()
func (b *Buffer) Write(p []byte) (n int, err error)
func (b *Buffer) WriteString(s string) (n int, err error)
func (b *Buffer) WriteByte(c byte) error
func (b *Buffer) WriteRune(r rune) (n int, err error)
func (b *Buffer) Read(p []byte) (n int, err error)
func (b *Buffer) ReadFrom(r io.Reader) (n int64, err error)
func (b *Buffer) WriteTo(w io.Writer) (n int64, err error)

func Equal(a, b []byte) bool
func Contains(b, subslice []byte) bool
func TrimSpace(s []byte) []byte
"#;

const BUFIO: &str = r#"
package bufio

import "io"

type Scanner struct {
	r io.Reader
}

func NewScanner(r io.Reader) *Scanner
func (s *Scanner) Scan() bool
func (s *Scanner) Text() string
func (s *Scanner) Bytes() []byte
func (s *Scanner) Err() error

type Reader struct {
	rd io.Reader
}

func NewReader(rd io.Reader) *Reader
func (b *Reader) ReadString(delim byte) (string, error)
func (b *Reader) ReadLine() (line []byte, isPrefix bool, err error)
func (b *Reader) Read(p []byte) (n int, err error)

type Writer struct {
	wr io.Writer
}

func NewWriter(w io.Writer) *Writer
func (b *Writer) Write(p []byte) (nn int, err error)
func (b *Writer) WriteString(s string) (int, error)
func (b *Writer) WriteByte(c byte) error
func (b *Writer) Flush() error
"#;

const CONTEXT: &str = r#"
package context

import "time"

type Context interface {
	Deadline() (deadline time.Time, ok bool)
	Done() <-chan struct{}
	Err() error
	Value(key any) any
}

type CancelFunc func()

var Canceled error
var DeadlineExceeded error

func Background() Context
func TODO() Context
func WithCancel(parent Context) (ctx Context, cancel CancelFunc)
func WithTimeout(parent Context, timeout time.Duration) (Context, CancelFunc)
func WithDeadline(parent Context, d time.Time) (Context, CancelFunc)
func WithValue(parent Context, key, val any) Context
"#;

const SYNC: &str = r#"
package sync

type Mutex struct {
	state int32
}

func (m *Mutex) Lock()
func (m *Mutex) Unlock()

type RWMutex struct {
	w Mutex
}

func (rw *RWMutex) Lock()
func (rw *RWMutex) Unlock()
func (rw *RWMutex) RLock()
func (rw *RWMutex) RUnlock()

type WaitGroup struct {
	state uint64
}

func (wg *WaitGroup) Add(delta int)
func (wg *WaitGroup) Done()
func (wg *WaitGroup) Wait()

type Once struct {
	done uint32
}

func (o *Once) Do(f func())
"#;

const TIME: &str = r#"
package time

type Duration int64

const (
	Nanosecond  Duration = 1
	Microsecond          = 1000 * Nanosecond
	Millisecond          = 1000 * Microsecond
	Second               = 1000 * Millisecond
	Minute               = 60 * Second
	Hour                 = 60 * Minute
)

func (d Duration) String() string
func (d Duration) Seconds() float64

type Month int

type Time struct {
	wall uint64
}

func Now() Time
func Since(t Time) Duration
func Unix(sec int64, nsec int64) Time
func Sleep(d Duration)
func Parse(layout, value string) (Time, error)
func ParseDuration(s string) (Duration, error)
func (t Time) Add(d Duration) Time
func (t Time) Sub(u Time) Duration
func (t Time) Before(u Time) bool
func (t Time) After(u Time) bool
func (t Time) Unix() int64
func (t Time) Format(layout string) string
func (t Time) IsZero() bool

const RFC3339 = "2006-01-02T15:04:05Z07:00"
"#;

const SORT: &str = r#"
package sort

type Interface interface {
	Len() int
	Less(i, j int) bool
	Swap(i, j int)
}

func Sort(data Interface)
func Strings(x []string)
func Ints(x []int)
func Slice(x any, less func(i, j int) bool)
func SliceStable(x any, less func(i, j int) bool)
func Search(n int, f func(int) bool) int
"#;

const JSON: &str = r#"
package json

import "io"

type Marshaler interface {
	MarshalJSON() ([]byte, error)
}

type Unmarshaler interface {
	UnmarshalJSON(data []byte) error
}

type Encoder struct {
	w io.Writer
}

func NewEncoder(w io.Writer) *Encoder
func (enc *Encoder) Encode(v any) error
func (enc *Encoder) SetIndent(prefix, indent string)

type Decoder struct {
	r io.Reader
}

func NewDecoder(r io.Reader) *Decoder
func (dec *Decoder) Decode(v any) error

func Marshal(v any) ([]byte, error)
func MarshalIndent(v any, prefix, indent string) ([]byte, error)
func Unmarshal(data []byte, v any) error
func Valid(data []byte) bool
"#;

const RAND: &str = r#"
package rand

func Int() int
func Intn(n int) int
func Int63() int64
func Float64() float64
func Seed(seed int64)
func Read(p []byte) (n int, err error)
func Shuffle(n int, swap func(i, j int))
func Perm(n int) []int
"#;

const FILEPATH: &str = r#"
package filepath

import "os"

type WalkFunc func(path string, info os.FileInfo, err error) error

var SkipDir error

func Join(elem ...string) string
func Base(path string) string
func Dir(path string) string
func Ext(path string) string
func Clean(path string) string
func Abs(path string) (string, error)
func Rel(basepath, targpath string) (string, error)
func Glob(pattern string) (matches []string, err error)
func Walk(root string, fn WalkFunc) error
func Split(path string) (dir, file string)
"#;

/// Stub source for an import path, if errfix knows the package.
pub fn source(path: &str) -> Option<&'static str> {
    let source = match path {
        "errors" => ERRORS,
        "fmt" => FMT,
        "io" => IO,
        "os" => OS,
        "log" => LOG,
        "testing" => TESTING,
        "strings" => STRINGS,
        "strconv" => STRCONV,
        "bytes" => BYTES,
        "bufio" => BUFIO,
        "context" => CONTEXT,
        "sync" => SYNC,
        "time" => TIME,
        "sort" => SORT,
        "encoding/json" => JSON,
        "math/rand" => RAND,
        "path/filepath" => FILEPATH,
        _ => return None,
    };
    Some(source)
}

/// Whether `path` looks like a standard-library import (no dot in the
/// first element).
pub fn is_standard(path: &str) -> bool {
    path.split('/').next().is_some_and(|first| !first.contains('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::IdGen;
    use crate::syntax::parser::parse_file;

    #[test]
    fn every_stub_parses() {
        for path in [
            "errors", "fmt", "io", "os", "log", "testing", "strings", "strconv", "bytes", "bufio",
            "context", "sync", "time", "sort", "encoding/json", "math/rand", "path/filepath",
        ] {
            let source = source(path).expect("stub exists");
            let mut ids = IdGen::default();
            if let Err(err) = parse_file(source, &mut ids) {
                panic!("stub {path} failed to parse: {err}");
            }
        }
    }

    #[test]
    fn standard_paths_have_no_domain() {
        assert!(is_standard("encoding/json"));
        assert!(!is_standard("example.com/mod/pkg"));
    }
}
