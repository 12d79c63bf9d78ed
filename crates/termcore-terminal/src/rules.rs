//! Built-in translation rules.
//!
//! Order is priority: specific phrasings come before the general ones
//! that would also match them. Every pattern is anchored so a rule cannot
//! fire on a mere prefix of the phrase.
//!
//! A phrase whose first word is a command name never gets here, so no
//! rule starts with one. Apostrophes open a quote in the tokenizer, so
//! phrasings like "what's" are not offered either. Fixed phrasings allow
//! one trailing `?`, `!` or `.`; a trailing capture keeps its own
//! punctuation and only sheds a `?` or `!` that stands apart from it.

pub(crate) const BUILTIN_RULES: &str = r#"
# --- directories ---------------------------------------------------------

[[rules]]
name = "make-folder"
command = "mkdir"
args = ["{name}"]
match = [{ regex = '^(?:create|make) (?:a )?(?:new )?(?:folder|directory) (?:called |named )?(?P<name>.+?)(?: [?!])?$' }]

[[rules]]
name = "go-up"
command = "cd"
args = [".."]
match = [{ regex = '^go (?:up|back) (?:a |one )?(?:level|directory|folder)[?!.]?$' }]

[[rules]]
name = "go-home"
command = "cd"
match = [{ regex = '^go (?:back )?home[?!.]?$' }]

[[rules]]
name = "change-folder"
command = "cd"
args = ["{path}"]
match = [{ regex = '^(?:go|change|switch) to (?:the )?(?:folder|directory) (?P<path>.+?)(?: [?!])?$' }]

[[rules]]
name = "navigate"
command = "cd"
args = ["{path}"]
match = [{ regex = '^navigate to (?P<path>.+?)(?: [?!])?$' }]

# --- files ---------------------------------------------------------------

[[rules]]
name = "show-file"
command = "cat"
args = ["{file}"]
match = [{ regex = '^(?:show|display|print|read|open) (?:me )?(?:the )?(?:contents? of )?(?:the )?file (?P<file>.+?)(?: [?!])?$' }]

[[rules]]
name = "copy-file"
command = "cp"
args = ["{src}", "{dest}"]
match = [{ regex = '^copy (?:the )?file (?P<src>.+?) (?:to|into) (?P<dest>.+?)(?: [?!])?$' }]

[[rules]]
name = "move-file"
command = "mv"
args = ["{src}", "{dest}"]
match = [{ regex = '^(?:move|rename) (?:the )?file (?P<src>.+?) (?:to|into|as) (?P<dest>.+?)(?: [?!])?$' }]

[[rules]]
name = "delete-file"
command = "rm"
args = ["{file}"]
match = [{ regex = '^(?:delete|remove|erase) (?:the )?file (?P<file>.+?)(?: [?!])?$' }]

[[rules]]
name = "count-file"
command = "wc"
args = ["{file}"]
match = [{ regex = '^count (?:the )?(?:lines|words) (?:in|of) (?:the )?(?:file )?(?P<file>.+?)(?: [?!])?$' }]

# --- listing -------------------------------------------------------------

[[rules]]
name = "list-here"
command = "ls"
match = [{ regex = '^(?:show|list) (?:me )?(?:all )?(?:the )?files?(?: in (?:this|the current) (?:folder|directory))?[?!.]?$' }]

[[rules]]
name = "list-folder"
command = "ls"
args = ["{path}"]
match = [{ regex = '^(?:show|list) (?:me )?(?:all )?(?:the )?files in (?:the )?(?:folder |directory )?(?P<path>.+?)(?: [?!])?$' }]

[[rules]]
name = "what-is-here"
command = "ls"
match = [{ regex = '^what is in (?:this|the current) (?:folder|directory)[?!.]?$' }]

# --- location ------------------------------------------------------------

[[rules]]
name = "where-am-i"
command = "pwd"
match = [{ regex = '^where am i[?!.]?$' }]

[[rules]]
name = "current-folder"
command = "pwd"
match = [{ regex = '^(?:what is|show) (?:me )?(?:my )?(?:the )?current (?:folder|directory|location)[?!.]?$' }]

# --- search --------------------------------------------------------------

[[rules]]
name = "search-in-file"
command = "grep"
args = ["{pattern}", "{file}"]
match = [{ regex = '^(?:look|search) for (?P<pattern>.+?) in (?:the )?file (?P<file>.+?)(?: [?!])?$' }]

[[rules]]
name = "locate-files"
command = "find"
args = [".", "-name", "{name}"]
match = [{ regex = '^locate (?:all )?(?:the )?files? (?:called |named )?(?P<name>.+?)(?: [?!])?$' }]

[[rules]]
name = "search-files"
command = "find"
args = [".", "-name", "{name}"]
match = [{ regex = '^search for (?:files? )?(?:called |named )?(?P<name>.+?)(?: [?!])?$' }]

# --- processes and system ------------------------------------------------

[[rules]]
name = "list-processes"
command = "ps"
match = [{ regex = '^(?:show|list) (?:me )?(?:all )?(?:the )?(?:running )?processes[?!.]?$' }]

[[rules]]
name = "which-processes"
command = "ps"
match = [{ regex = '^what processes are running[?!.]?$' }]

[[rules]]
name = "system-info"
command = "top"
match = [{ regex = '^show (?:me )?(?:the )?system (?:info|information|resources|usage)[?!.]?$' }]

[[rules]]
name = "terminate-process"
command = "kill"
args = ["{pid}"]
match = [{ regex = '^(?:terminate|stop|end) (?:the )?process (?P<pid>\d+)[?!.]?$' }]

# --- session -------------------------------------------------------------

[[rules]]
name = "what-can-i-do"
command = "help"
match = [{ regex = '^what can (?:i|you) do[?!.]?$' }]

[[rules]]
name = "show-commands"
command = "help"
match = [{ regex = '^show (?:me )?(?:the )?(?:available )?commands[?!.]?$' }]

[[rules]]
name = "show-history"
command = "history"
match = [{ regex = '^show (?:me )?(?:my )?(?:the )?(?:command )?history[?!.]?$' }]

[[rules]]
name = "wipe-screen"
command = "clear"
match = [{ regex = '^(?:wipe|clean|reset) (?:the )?screen[?!.]?$' }]

[[rules]]
name = "say"
command = "echo"
args = ["{text}"]
match = [{ regex = '^(?:say|print) (?P<text>.+?)(?: [?!])?$' }]

# --- resource questions (keyword based, kept last) -----------------------

[[rules]]
name = "disk-space"
command = "df"
match = [{ keyword = "disk" }, { regex = '\b(?:space|usage|free|left)\b' }]

[[rules]]
name = "memory-usage"
command = "free"
match = [{ keyword = "memory" }, { regex = '\b(?:usage|used|free|left|available)\b' }]
"#;
