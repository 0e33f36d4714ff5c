//! A small ambient library of helpers defined in the dialect itself rather
//! than as native builtins, imported once into `BASE_GLOBALS` at bootstrap.
//! Every definition here is expressible purely in terms of special forms
//! and already-registered builtins — nothing here needs host access.

pub const PRELUDE_SOURCE: &str = r#"
(defun identity (x) x)

(defun constantly (x) (fn (&rest ignored) x))

(defun funcall (f &rest args) (apply f args))

(defun mapcar (f seq) (map f seq))

(defun filter (pred seq) (where pred seq))

(defun caar (x) (car (car x)))
(defun cadr (x) (car (cdr x)))
(defun cdar (x) (cdr (car x)))
(defun cddr (x) (cdr (cdr x)))
(defun caddr (x) (car (cddr x)))
(defun cdddr (x) (cdr (cddr x)))

(defun reverse (seq)
  (let ((acc nil))
    (dorun (fn (x) (setq acc (cons x acc))) seq)
    acc))

(defun last (seq)
  (cond
    ((endp seq) nil)
    ((endp (cdr seq)) (car seq))
    (t (last (cdr seq)))))

(defun member (item seq)
  (cond
    ((endp seq) nil)
    ((equal item (car seq)) seq)
    (t (member item (cdr seq)))))

(defun zip (a b)
  (cond
    ((endp a) nil)
    ((endp b) nil)
    (t (cons (list (car a) (car b)) (zip (cdr a) (cdr b))))))

(defun compose (&rest fns)
  (cond
    ((endp fns) identity)
    ((endp (cdr fns)) (car fns))
    (t (let ((f (car fns)) (rest-fn (apply compose (cdr fns))))
         (fn (x) (f (rest-fn x)))))))

(defun partial (f &rest bound-args)
  (fn (&rest more-args) (apply f (append bound-args more-args))))
"#;
